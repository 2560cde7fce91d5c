//! Typed in-memory node values and the coercions applied when a caller asks
//! for a specific type back out (§3 "Value typing").

/// The payload a node may carry.
///
/// On disk everything is text; in memory (the volatile backing, §4.2) a
/// value may carry any of these without forcing a round trip through a
/// string until it is actually read as one or serialized.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Stringifies this value the way it would be written to disk:
    /// `"1"`/`"0"` for bool, decimal for int, default formatting for float.
    pub fn to_value_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Default float formatting, matching Python's `str(float)` closely enough
/// for round-tripping model parameters: whole numbers keep a trailing `.0`.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Coerces a raw on-disk string into a requested type, falling back to
/// `default` per the rules of `get_or_default` (§4.1, §7 `TypeCoercion`).
pub trait Gettable: Sized {
    fn coerce_or(raw: &str, default: Self) -> Self;
}

impl Gettable for bool {
    fn coerce_or(raw: &str, _default: Self) -> Self {
        let trimmed = raw.trim();
        trimmed == "1" || trimmed == "true"
    }
}

impl Gettable for i64 {
    fn coerce_or(raw: &str, default: Self) -> Self {
        raw.trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .unwrap_or(default)
    }
}

impl Gettable for f64 {
    fn coerce_or(raw: &str, default: Self) -> Self {
        raw.trim().parse::<f64>().unwrap_or(default)
    }
}

impl Gettable for String {
    fn coerce_or(raw: &str, _default: Self) -> Self {
        raw.to_string()
    }
}

/// What callers may pass to `Node::set` (§4.1 "set").
pub enum Settable {
    Node(crate::node::Node),
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<&str> for Settable {
    fn from(s: &str) -> Self {
        Settable::Str(s.to_string())
    }
}
impl From<String> for Settable {
    fn from(s: String) -> Self {
        Settable::Str(s)
    }
}
impl From<bool> for Settable {
    fn from(b: bool) -> Self {
        Settable::Bool(b)
    }
}
impl From<i64> for Settable {
    fn from(i: i64) -> Self {
        Settable::Int(i)
    }
}
impl From<f64> for Settable {
    fn from(f: f64) -> Self {
        Settable::Float(f)
    }
}
impl From<crate::node::Node> for Settable {
    fn from(n: crate::node::Node) -> Self {
        Settable::Node(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formats_like_python_str() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(3.14), "3.14");
    }

    #[test]
    fn bool_coercion_matches_spec() {
        assert!(bool::coerce_or(" 1 ", false));
        assert!(bool::coerce_or("true", false));
        assert!(!bool::coerce_or("0", true));
        assert!(!bool::coerce_or("false", true));
    }

    #[test]
    fn int_coercion_rounds_float() {
        assert_eq!(i64::coerce_or("2.6", 0), 3);
        assert_eq!(i64::coerce_or("not a number", 7), 7);
    }
}
