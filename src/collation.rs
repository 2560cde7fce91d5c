//! M collation: the key ordering used throughout the store (§3 "Key ordering").
//!
//! Numbers sort before non-numbers; two numbers compare by magnitude; two
//! non-numbers compare lexicographically. This mirrors the `compare` static
//! method on the original `MNode` class.

use std::cmp::Ordering;

/// Compares two keys in M collation order.
///
/// Returns `Ordering::Equal` whenever `a == b` as strings, and also whenever
/// both parse as numbers of the same magnitude (e.g. `"1"` and `"1.0"`) — this
/// matches the original's definition of the ordering exactly. Callers that
/// need a total order over distinct strings (map storage) should not use this
/// function directly; see [`CollKey`].
pub fn m_compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (parse_m_number(a), parse_m_number(b)) {
        (None, None) => a.cmp(b),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

fn parse_m_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    // Exclude the non-numeric special float tokens Rust's parser otherwise
    // accepts; M collation has no notion of infinity or NaN as a "number".
    match t.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "-inf" | "infinity" | "+infinity" | "-infinity" | "nan" | "-nan" => {
            return None
        }
        _ => {}
    }
    t.parse::<f64>().ok()
}

/// Map key wrapper giving children a deterministic, M-collation-consistent
/// total order for use in an ordered map.
///
/// [`m_compare`] alone is not a valid `Ord` for map storage: it can return
/// `Equal` for two *distinct* strings that happen to denote the same numeric
/// value (`"1"` and `"1.0"`). Two such strings are still different child
/// keys and must not collide in the tree. `CollKey` breaks such ties with a
/// plain string comparison, so the resulting order refines `m_compare` (any
/// pair `m_compare` orders strictly, `CollKey` orders the same way) while
/// remaining a strict total order over all strings.
#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct CollKey(pub String);

impl Ord for CollKey {
    fn cmp(&self, other: &Self) -> Ordering {
        m_compare(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for CollKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_numerics_before_non_numerics() {
        let mut keys = vec!["10", "9", "abc", "2", "1a"];
        keys.sort_by(|a, b| m_compare(a, b));
        assert_eq!(keys, vec!["2", "9", "10", "1a", "abc"]);
    }

    #[test]
    fn collkey_never_collapses_distinct_strings() {
        let a = CollKey("1".to_string());
        let b = CollKey("1.0".to_string());
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }
}
