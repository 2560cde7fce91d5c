//! The schema-2 text serialization format (§4.6): a one-line header
//! (`N2A.schema=<version>[,<type>]`) followed by an indentation-delimited
//! body. This is the only on-disk format this crate writes; the header's
//! version field exists so a future format can still be told apart from
//! this one, the way the original distinguishes `Schema1` from `Schema2`.

mod reader;
mod writer;

use std::io::{BufRead, Write};

use crate::error::ReadError;
use crate::node::Node;

/// The current (and, here, only implemented) body format.
pub const CURRENT_VERSION: u32 = 3;

/// Reads a header and body from `reader`, replacing `root`'s children with
/// what was parsed. Returns the header's version and type-annotation
/// string. Body-level I/O errors are swallowed (parsing simply stops,
/// keeping whatever was already read); only a missing/malformed header is
/// a hard error.
pub fn read_all<R: BufRead>(root: &Node, reader: &mut R) -> Result<(u32, String), ReadError> {
    let header = read_header(reader)?;
    reader::read_body(root, reader);
    Ok(header)
}

/// Writes a header followed by `root`'s children (`root` itself — its key
/// and value — is never written; it is purely a container).
pub fn write_all<W: Write>(root: &Node, writer: &mut W) -> std::io::Result<()> {
    write_header(writer, CURRENT_VERSION, "")?;
    writer::write_body(root, writer)
}

fn read_header<R: BufRead>(reader: &mut R) -> Result<(u32, String), ReadError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).map_err(|_| ReadError::BadHeader)?;
    if n == 0 {
        return Err(ReadError::EmptyFile);
    }
    let line = line.trim_end_matches(['\n', '\r']).trim();
    const PREFIX: &str = "N2A.schema";
    if line.len() < PREFIX.len() + 2 || !line.starts_with(PREFIX) {
        return Err(ReadError::BadHeader);
    }
    let rest = &line[PREFIX.len()..];
    let rest = rest.strip_prefix('=').ok_or(ReadError::BadHeader)?;
    let mut pieces = rest.splitn(2, ',');
    let version: u32 = pieces
        .next()
        .unwrap_or("")
        .parse()
        .map_err(|_| ReadError::BadHeader)?;
    let kind = pieces.next().unwrap_or("").trim().to_string();
    Ok((version, kind))
}

fn write_header<W: Write>(writer: &mut W, version: u32, kind: &str) -> std::io::Result<()> {
    if kind.is_empty() {
        writeln!(writer, "N2A.schema={version}")
    } else {
        writeln!(writer, "N2A.schema={version},{kind}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn rejects_empty_file() {
        let mut input: &[u8] = b"";
        let root = Node::new_volatile("root");
        assert_eq!(read_all(&root, &mut input), Err(ReadError::EmptyFile));
    }

    #[test]
    fn rejects_malformed_header() {
        let mut input: &[u8] = b"not a header\n";
        let root = Node::new_volatile("root");
        assert_eq!(read_all(&root, &mut input), Err(ReadError::BadHeader));
    }

    #[test]
    fn round_trips_nested_document() {
        let root = Node::new_volatile("root");
        root.set_child("a", Some("1".to_string()));
        let b = root.set_child("b", None);
        b.set_child("c", Some("hello\nworld".to_string()));

        let mut buf: Vec<u8> = Vec::new();
        write_all(&root, &mut buf).unwrap();

        let parsed = Node::new_volatile("root");
        let mut cursor: &[u8] = &buf;
        let (version, _) = read_all(&parsed, &mut cursor).unwrap();
        assert_eq!(version, CURRENT_VERSION);
        assert_eq!(parsed.get_child("a").unwrap().get_value().unwrap(), "1");
        let pb = parsed.get_child("b").unwrap();
        assert!(!pb.is_defined());
        assert_eq!(
            pb.get_child("c").unwrap().get_value().unwrap(),
            "hello\nworld"
        );
    }

    #[test]
    fn parses_block_text_child() {
        let input = b"N2A.schema=3\nkey:|\n line1\n line2\n";
        let root = Node::new_volatile("root");
        let mut cursor: &[u8] = input;
        read_all(&root, &mut cursor).unwrap();
        let child = root.get_child("key").unwrap();
        assert_eq!(child.get_value().unwrap(), "line1\nline2");
    }
}
