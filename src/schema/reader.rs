//! Schema-2 body parsing: indentation-delimited, quoted-key, block-text
//! line format (§4.6).

use std::io::BufRead;

use crate::node::Node;

/// Tracks the current line and its leading-space count, the way the
/// original line-oriented reader does; `whitespace < 0` means end of file,
/// which lets every indentation comparison below fall out naturally
/// without a separate EOF check.
struct LineReader<'a, R: BufRead> {
    reader: &'a mut R,
    line: String,
    whitespace: isize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        let mut lr = LineReader {
            reader,
            line: String::new(),
            whitespace: 0,
        };
        lr.advance();
        lr
    }

    /// Skips blank physical lines, so an empty line inside block text
    /// silently disappears rather than ending the block early.
    fn advance(&mut self) {
        loop {
            let mut raw = String::new();
            match self.reader.read_line(&mut raw) {
                Ok(0) | Err(_) => {
                    self.line.clear();
                    self.whitespace = -1;
                    return;
                }
                Ok(_) => {}
            }
            if raw == "\n" || raw == "\r\n" {
                continue;
            }
            while raw.ends_with('\n') || raw.ends_with('\r') {
                raw.pop();
            }
            self.whitespace = raw.chars().take_while(|&c| c == ' ').count() as isize;
            self.line = raw;
            return;
        }
    }

    fn at_eof(&self) -> bool {
        self.whitespace < 0
    }
}

/// Splits a stripped line into its key and, if a `:` is present outside a
/// quoted key, its value. `None` means the line declared a key with no
/// value (an explicitly undefined node).
fn parse_key_value(line: &str) -> (String, Option<String>) {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return (String::new(), None);
    }
    let last = chars.len() as isize - 1;
    let mut key = String::new();
    let mut value: Option<String> = None;
    let mut escape = chars[0] == '"';
    let mut i: isize = if escape { 1 } else { 0 };
    while i <= last {
        let c = chars[i as usize];
        if escape {
            if c == '"' {
                i += 1;
                if i > last {
                    break;
                }
                if chars[i as usize] != '"' {
                    escape = false;
                    continue;
                }
                // doubled quote: falls through, pushing one literal `"`
            }
        } else if c == ':' {
            let rest: String = chars[(i as usize + 1)..].iter().collect();
            value = Some(rest.trim().to_string());
            break;
        }
        key.push(c);
        i += 1;
    }
    (key.trim().to_string(), value)
}

fn read_level<R: BufRead>(node: &Node, lr: &mut LineReader<R>, whitespace: isize) {
    while !lr.at_eof() {
        let line = lr.line.trim().to_string();
        let (key, mut value) = parse_key_value(&line);
        match &value {
            Some(v) if v.starts_with('|') => {
                let mut block = String::new();
                lr.advance();
                if lr.whitespace > whitespace {
                    let block_indent = lr.whitespace as usize;
                    loop {
                        let tail: String = lr.line.chars().skip(block_indent).collect();
                        block.push_str(&tail);
                        lr.advance();
                        if lr.whitespace < block_indent as isize {
                            break;
                        }
                        block.push('\n');
                    }
                }
                value = Some(block);
            }
            _ => lr.advance(),
        }
        let child = node.set_child(&key, value);
        if lr.whitespace > whitespace {
            read_level(&child, lr, lr.whitespace);
        }
        if lr.whitespace < whitespace {
            return;
        }
    }
}

/// Replaces `root`'s children with the tree read from `reader`'s body
/// (the header line must already have been consumed).
pub(super) fn read_body<R: BufRead>(root: &Node, reader: &mut R) {
    for key in root.child_keys() {
        root.clear_child(&key);
    }
    let mut lr = LineReader::new(reader);
    read_level(root, &mut lr, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_key_value() {
        assert_eq!(parse_key_value("a:1"), ("a".to_string(), Some("1".to_string())));
    }

    #[test]
    fn undefined_key_has_no_colon() {
        assert_eq!(parse_key_value("a"), ("a".to_string(), None));
    }

    #[test]
    fn quoted_key_unescapes_doubled_quote() {
        assert_eq!(
            parse_key_value("\"a\"\"b\":1"),
            ("a\"b".to_string(), Some("1".to_string()))
        );
    }

    #[test]
    fn quoted_key_allows_embedded_colon() {
        assert_eq!(
            parse_key_value("\"a:b\":1"),
            ("a:b".to_string(), Some("1".to_string()))
        );
    }
}
