//! Tabular trace output and its `.columns` sidecar — peripheral
//! collaborators that neither consume nor produce [`crate::node::Node`]
//! trees, specified only at their interface (spec.md §1 "Out of scope").
//!
//! `OutputHolder` is a faithful port of the original's trace writer: tab
//! separated rows, lazily discovered columns, and a sidecar written through
//! the same schema-2 line format as every document (`write_modes`, grounded
//! on `OutputHolder.py`). The parser side (`OutputParser`'s column
//! statistics) is explicitly out of scope; [`ColumnsSidecar::read`] only
//! reads the sidecar back, which is the one piece of that contract this
//! crate needs for its own round-trip tests.

use std::collections::HashMap;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

struct Column {
    name: String,
    value: f64,
    /// Attribute order matters for `write_modes`'s output, so this stays a
    /// `Vec` rather than a map.
    mode: Vec<(String, String)>,
}

/// Writes rows of a trace file exactly like the original's `Holder`: one
/// line per distinct time step, columns discovered and tab-separated in
/// first-seen order, with a `<path>.columns` sidecar recording header names
/// and per-column attributes.
pub struct OutputHolder<W: Write> {
    out: W,
    columns_path: PathBuf,
    column_index: HashMap<String, usize>,
    columns: Vec<Column>,
    columns_previous: usize,
    t: f64,
    trace_received: bool,
    /// When set, `column` names are parsed as an explicit 1-based index
    /// (offset by the implicit `$t` column) instead of first-seen order.
    pub raw: bool,
}

impl OutputHolder<BufWriter<std::fs::File>> {
    /// Opens `path` for the trace and derives `<path>.columns` for the
    /// sidecar, matching `OutputHolder.__init__`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let mut columns_path = path.as_os_str().to_owned();
        columns_path.push(".columns");
        Ok(OutputHolder::new(BufWriter::new(file), PathBuf::from(columns_path)))
    }
}

impl<W: Write> OutputHolder<W> {
    pub fn new(out: W, columns_path: PathBuf) -> Self {
        OutputHolder {
            out,
            columns_path,
            column_index: HashMap::new(),
            columns: Vec::new(),
            columns_previous: 0,
            t: 0.0,
            trace_received: false,
            raw: false,
        }
    }

    /// Records one value for `column` at time `now`. `mode` is a
    /// comma-separated list of `key` or `key=value` attributes; `timeScale`
    /// and the chart-wide `xmax`/`xmin`/`ymax`/`ymin` keys are redirected
    /// onto column 0 (the implicit `$t` column) regardless of which column
    /// they were attached to, matching the original.
    pub fn trace(&mut self, now: f64, column: &str, value: f64, mode: &str) -> io::Result<()> {
        if now > self.t {
            self.write_trace()?;
            self.t = now;
        }

        if !self.trace_received {
            self.trace_received = true;
            if self.columns.is_empty() {
                self.column_index.insert("$t".to_string(), 0);
                self.columns.push(Column {
                    name: "$t".to_string(),
                    value: self.t,
                    mode: Vec::new(),
                });
            } else {
                self.columns[0].value = self.t;
            }
        }

        let index = if let Some(&i) = self.column_index.get(column) {
            i
        } else if self.raw {
            let i: usize = column.parse::<usize>().unwrap_or(0) + 1;
            while self.columns.len() <= i {
                self.columns.push(Column {
                    name: String::new(),
                    value: f64::NAN,
                    mode: Vec::new(),
                });
            }
            self.column_index.insert(column.to_string(), i);
            i
        } else {
            let i = self.columns.len();
            self.column_index.insert(column.to_string(), i);
            self.columns.push(Column {
                name: column.to_string(),
                value: f64::NAN,
                mode: Vec::new(),
            });
            i
        };
        self.columns[index].value = value;
        if self.columns[index].name.is_empty() {
            self.columns[index].name = column.to_string();
        }

        for piece in mode.split(',') {
            let piece = piece.trim();
            if piece.is_empty() || piece == "raw" {
                continue;
            }
            let mut parts = piece.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            let val = parts.next().unwrap_or("").trim();
            let target = match key {
                "timeScale" => {
                    self.columns[0].mode.push(("scale".to_string(), val.to_string()));
                    continue;
                }
                "xmax" | "xmin" | "ymax" | "ymin" => 0,
                _ => index,
            };
            self.columns[target].mode.push((key.to_string(), val.to_string()));
        }
        Ok(())
    }

    /// Flushes the current row, writing a new header line first if columns
    /// were added since the last one.
    pub fn write_trace(&mut self) -> io::Result<()> {
        if !self.trace_received {
            return Ok(());
        }
        let count = self.columns.len();
        let last = count.saturating_sub(1);

        if count > self.columns_previous {
            if !self.raw {
                for (i, col) in self.columns.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, "\t")?;
                    }
                    if col.name.chars().any(|c| matches!(c, ' ' | '\t' | ',' | '"')) {
                        write!(self.out, "\"{}\"", col.name.replace('"', "\"\""))?;
                    } else {
                        write!(self.out, "{}", col.name)?;
                    }
                }
                writeln!(self.out)?;
            }
            self.columns_previous = count;
            self.write_modes()?;
        }

        for (i, col) in self.columns.iter_mut().enumerate() {
            if !col.value.is_nan() {
                write!(self.out, "{}", col.value)?;
            }
            if i < last {
                write!(self.out, "\t")?;
            }
            col.value = f64::NAN;
        }
        writeln!(self.out)?;
        self.trace_received = false;
        Ok(())
    }

    /// Rewrites the `.columns` sidecar: `N2A.schema=3`, then one
    /// `<index>:<name>` line per column with its attributes indented below.
    pub fn write_modes(&self) -> io::Result<()> {
        let mut file = BufWriter::new(std::fs::File::create(&self.columns_path)?);
        writeln!(file, "N2A.schema={}", crate::schema::CURRENT_VERSION)?;
        for (index, col) in self.columns.iter().enumerate() {
            writeln!(file, "{index}:{}", col.name)?;
            for (key, val) in &col.mode {
                writeln!(file, " {key}:{val}")?;
            }
        }
        Ok(())
    }

    /// Flushes the last row and writes the final sidecar, matching
    /// `OutputHolder.close`.
    pub fn close(&mut self) -> io::Result<()> {
        self.write_trace()?;
        self.out.flush()?;
        self.write_modes()
    }
}

/// One entry from a `.columns` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub index: usize,
    pub header: String,
    pub attributes: HashMap<String, String>,
}

/// Reads a `.columns` sidecar back. Shares the schema-2 codec with
/// documents because the sidecar happens to already be one: an
/// `<index>:<header>` entry with indented `<attr>:<value>` children is
/// exactly a schema-2 body.
pub struct ColumnsSidecar;

impl ColumnsSidecar {
    pub fn read(path: impl AsRef<Path>) -> Result<Vec<ColumnInfo>, crate::error::ReadError> {
        let file = std::fs::File::open(path).map_err(|_| crate::error::ReadError::EmptyFile)?;
        let mut reader = io::BufReader::new(file);
        let root = crate::node::Node::empty();
        crate::schema::read_all(&root, &mut reader)?;

        let mut columns = Vec::new();
        for key in root.child_keys() {
            let Some(child) = root.get_child(&key) else { continue };
            let Ok(index) = key.parse::<usize>() else { continue };
            let header = child.get_value().unwrap_or_default();
            let mut attributes = HashMap::new();
            for attr_key in child.child_keys() {
                if let Some(attr) = child.get_child(&attr_key) {
                    attributes.insert(attr_key, attr.get_value().unwrap_or_default());
                }
            }
            columns.push(ColumnInfo { index, header, attributes });
        }
        columns.sort_by_key(|c| c.index);
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_writes_header_once_then_rows() {
        let mut buf = Vec::new();
        let mut holder = OutputHolder::new(&mut buf, PathBuf::from("/dev/null"));
        holder.trace(0.0, "a", 1.0, "").unwrap();
        holder.trace(1.0, "a", 2.0, "").unwrap();
        holder.write_trace().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "$t\ta\n0\t1\n1\t2\n");
    }

    #[test]
    fn sidecar_round_trips_headers_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let columns_path = dir.path().join("out.columns");
        let mut buf = Vec::new();
        let mut holder = OutputHolder::new(&mut buf, columns_path.clone());
        holder.trace(0.0, "voltage", 1.0, "color=blue").unwrap();
        holder.close().unwrap();

        let parsed = ColumnsSidecar::read(&columns_path).unwrap();
        assert_eq!(parsed.len(), 2);
        let voltage = parsed.iter().find(|c| c.header == "voltage").unwrap();
        assert_eq!(voltage.attributes.get("color").unwrap(), "blue");
    }
}
