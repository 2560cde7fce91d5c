//! Schema-2 body serialization, the inverse of [`super::reader`] (§4.6).

use std::io::{self, Write};

use crate::node::Node;

/// Writes `root`'s children (not `root` itself) in schema-2 body format.
pub(super) fn write_body<W: Write>(root: &Node, writer: &mut W) -> io::Result<()> {
    for key in root.child_keys() {
        if let Some(child) = root.get_child(&key) {
            write_node(&child, writer, "")?;
        }
    }
    Ok(())
}

fn write_node<W: Write>(node: &Node, writer: &mut W, indent: &str) -> io::Result<()> {
    let raw_key = node.key();
    let key = if raw_key.is_empty() || raw_key.starts_with('"') || raw_key.contains(':') {
        format!("\"{}\"", raw_key.replace('"', "\"\""))
    } else {
        raw_key
    };

    if !node.is_defined() {
        // No colon: this is how an explicitly undefined node is told apart
        // from one defined as the empty string.
        writeln!(writer, "{indent}{key}")?;
    } else {
        let value = node.get_value().unwrap_or_default();
        if value.contains('\n') || value.starts_with('|') {
            let escaped = value.replace('\n', &format!("\n{indent} "));
            writeln!(writer, "{indent}{key}:|\n{indent} {escaped}")?;
        } else {
            writeln!(writer, "{indent}{key}:{value}")?;
        }
    }

    let child_indent = format!("{indent} ");
    for child_key in node.child_keys() {
        if let Some(child) = node.get_child(&child_key) {
            write_node(&child, writer, &child_indent)?;
        }
    }
    Ok(())
}
