//! Derived tree operations: path/ancestry queries, typed getters, the
//! merge/diff algebra, and structural comparisons (§4.7, §4.8).
//!
//! Every operation here is built once, purely in terms of [`Node`]'s
//! primitives (`key`, `parent`, `get_child`, `set_child`, `clear_child`,
//! `child_keys`, `get_value`, `set_value`, `is_defined`) — it has no
//! knowledge of whether a given node is volatile, persistent, a document,
//! or a group.

use std::cmp::Ordering;

use crate::collation::m_compare;
use crate::node::Node;
use crate::value::{Gettable, Settable, Value};

impl Node {
    /// Number of steps up to `root` (or to the actual root, if `root`
    /// isn't an ancestor of `self`).
    pub fn depth(&self, root: Option<&Node>) -> usize {
        if let Some(r) = root {
            if Node::ptr_eq(self, r) {
                return 0;
            }
        }
        match self.parent() {
            None => 0,
            Some(p) => p.depth(root) + 1,
        }
    }

    /// Keys from just below `root` down to `self`, in root-to-leaf order.
    /// Does not include the key of the root node itself — when `root` is
    /// `None` (or isn't an ancestor of `self`), this stops one short of the
    /// actual root, matching `depth`'s sizing.
    pub fn key_path(&self, root: Option<&Node>) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = self.clone();
        loop {
            if let Some(r) = root {
                if Node::ptr_eq(&current, r) {
                    break;
                }
            }
            match current.parent() {
                Some(p) => {
                    result.push(current.key());
                    current = p;
                }
                None => break,
            }
        }
        result.reverse();
        result
    }

    pub fn key_path_string(&self, root: Option<&Node>) -> String {
        self.key_path(root).join(".")
    }

    pub fn root(&self) -> Node {
        let mut result = self.clone();
        while let Some(p) = result.parent() {
            result = p;
        }
        result
    }

    /// Last common ancestor of `self` and `other`, or `None` if they don't
    /// share one.
    pub fn lca(&self, other: &Node) -> Option<Node> {
        let mut ancestors = Vec::new();
        let mut a = Some(self.clone());
        while let Some(node) = a {
            a = node.parent();
            ancestors.push(node);
        }
        let mut b = Some(other.clone());
        while let Some(node) = b {
            if ancestors.iter().any(|x| Node::ptr_eq(x, &node)) {
                return Some(node);
            }
            b = node.parent();
        }
        None
    }

    /// Digs down an arbitrary number of levels, or `None` if any segment
    /// is missing.
    pub fn child(&self, keys: &[&str]) -> Option<Node> {
        let mut result = self.clone();
        for key in keys {
            result = result.get_child(key)?;
        }
        Some(result)
    }

    /// The indexing-operator-equivalent lookup: unlike `child`, a missing
    /// segment is an error rather than `None` (§7 `KeyNotFound`).
    pub fn required(&self, key: &str) -> Result<Node, crate::error::LookupError> {
        self.get_child(key)
            .ok_or_else(|| crate::error::LookupError::KeyNotFound(key.to_string()))
    }

    /// Like [`Node::child`], but creates any missing segment along the way.
    pub fn child_or_create(&self, keys: &[&str]) -> Node {
        let mut result = self.clone();
        for key in keys {
            result = match result.get_child(key) {
                Some(c) => c,
                None => result.set_child(key, None),
            };
        }
        result
    }

    /// For iterating over a subtree that may not exist: an unattached,
    /// empty placeholder if `keys` doesn't resolve.
    pub fn child_or_empty(&self, keys: &[&str]) -> Node {
        self.child(keys).unwrap_or_else(Node::empty)
    }

    /// The child at an ordinal position in M collation order, or `None` if
    /// out of range.
    pub fn child_at(&self, index: usize) -> Option<Node> {
        self.child_keys().get(index).and_then(|k| self.get_child(k))
    }

    /// Removes every child of this node.
    pub fn clear(&self) {
        for key in self.child_keys() {
            self.clear_child(&key);
        }
    }

    /// Removes the descendant at an arbitrary depth; a no-op if the path
    /// doesn't resolve.
    pub fn clear_path(&self, keys: &[&str]) {
        let Some((last, init)) = keys.split_last() else {
            self.clear();
            return;
        };
        let Some(target) = self.child(init) else { return };
        target.clear_child(last);
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Deep query: does `key` exist anywhere in this subtree?
    pub fn contains_key(&self, key: &str) -> bool {
        if self.get_child(key).is_some() {
            return true;
        }
        self.child_keys()
            .iter()
            .filter_map(|k| self.get_child(k))
            .any(|c| c.contains_key(key))
    }

    /// This node's value, defaulting to `""` if undefined.
    pub fn get(&self) -> String {
        self.get_value().unwrap_or_default()
    }

    /// Digs down to retrieve a value, defaulting to `""` if any segment is
    /// missing.
    pub fn get_path(&self, keys: &[&str]) -> String {
        self.child(keys).map(|c| c.get()).unwrap_or_default()
    }

    /// The value at `keys`, or `default` if the node is undefined, unset
    /// to `""`, or missing entirely.
    fn get_or_default_str(&self, keys: &[&str]) -> Option<String> {
        let value = self.get_path(keys);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// `getOrDefault(defaultValue, *keys)` (MNode.py:245-254): digs down to
    /// `keys`, coercing the stored text to `default`'s type, or returns
    /// `default` unchanged if any segment is undefined, unset, or missing.
    pub fn get_or_default<T: Gettable>(&self, default: T, keys: &[&str]) -> T {
        match self.get_or_default_str(keys) {
            Some(v) => T::coerce_or(&v, default),
            None => default,
        }
    }

    pub fn get_bool(&self, keys: &[&str]) -> bool {
        self.get_or_default(false, keys)
    }

    /// Like [`Node::get_bool`], but defaults to `true`: a flag is
    /// considered set merely by existing, unless its value is literally
    /// `"0"`.
    pub fn get_flag(&self, keys: &[&str]) -> bool {
        match self.child(keys) {
            None => false,
            Some(c) => c.get() != "0",
        }
    }

    pub fn get_int(&self, keys: &[&str]) -> i64 {
        self.get_or_default(0, keys)
    }

    pub fn get_float(&self, keys: &[&str]) -> f64 {
        self.get_or_default(0.0, keys)
    }

    /// Creates every node necessary to set a value at `keys`, returning
    /// the target node. When `value` is itself a [`Node`], the target is
    /// cleared and merged from it rather than stringified (§4.8 "set").
    pub fn set(&self, value: impl Into<Settable>, keys: &[&str]) -> Node {
        let target = self.child_or_create(keys);
        match value.into() {
            Settable::Node(source) => {
                target.clear();
                target.set_value(None);
                target.merge(&source);
            }
            Settable::Str(s) => target.set_value(Some(s)),
            Settable::Bool(b) => target.set_value(Some(Value::Bool(b).to_value_string())),
            Settable::Int(i) => target.set_value(Some(Value::Int(i).to_value_string())),
            Settable::Float(f) => target.set_value(Some(Value::Float(f).to_value_string())),
        }
        target
    }

    /// Stores a float truncated to `precision` decimal places, dropping
    /// trailing zeroes (and the decimal point itself, if nothing remains
    /// after it) to avoid storing junk precision.
    pub fn set_truncated(&self, value: f64, precision: u32, keys: &[&str]) -> Node {
        let shift = 10f64.powi(precision as i32);
        let converted = (value * shift).round() / shift;
        let mut text = Value::Float(converted).to_value_string();
        if let Some(pos) = text.find('.') {
            let bytes = text.as_bytes();
            let mut end = (pos + precision as usize).min(bytes.len() - 1) as isize;
            let pos = pos as isize;
            while end >= pos {
                let c = bytes[end as usize] as char;
                if c != '0' && c != '.' {
                    break;
                }
                end -= 1;
            }
            text.truncate((end + 1).max(0) as usize);
        }
        self.set(text, keys)
    }

    /// Deep-copies `other` into `self`; `self`'s own non-overlapping
    /// children are left untouched, and `self`'s value is only replaced if
    /// `other`'s is defined (§4.8 "merge").
    pub fn merge(&self, other: &Node) {
        if other.is_defined() {
            self.set_value(Some(other.get()));
        }
        for key in other.child_keys() {
            let Some(other_child) = other.get_child(&key) else { continue };
            let c = match self.get_child(&key) {
                Some(c) => c,
                None => self.set_child(&key, None),
            };
            c.merge(&other_child);
        }
    }

    /// Like [`Node::merge`], but every value already present in `self` —
    /// at any depth — wins over `other` ("underride").
    pub fn merge_under(&self, other: &Node) {
        if !self.is_defined() && other.is_defined() {
            self.set_value(Some(other.get()));
        }
        for key in other.child_keys() {
            let Some(other_child) = other.get_child(&key) else { continue };
            match self.get_child(&key) {
                None => {
                    self.set(Settable::Node(other_child), &[&key]);
                }
                Some(c) => c.merge_under(&other_child),
            }
        }
    }

    /// Leaves only the nodes *not* present in `other`, undefining (rather
    /// than removing) a parent whose own value came from `other` (§4.8
    /// "tree differencing").
    pub fn unique_nodes(&self, other: &Node) {
        if other.is_defined() {
            self.set_value(None);
        }
        for key in self.child_keys() {
            let Some(c) = self.get_child(&key) else { continue };
            let Some(d) = other.get_child(&key) else { continue };
            c.unique_nodes(&d);
            if c.is_empty() && !c.is_defined() {
                self.clear_child(&key);
            }
        }
    }

    /// Leaves only the nodes whose key or value differs from `other`.
    pub fn unique_values(&self, other: &Node) {
        if self.is_defined() && other.is_defined() && self.get() == other.get() {
            self.set_value(None);
        }
        for key in self.child_keys() {
            let Some(c) = self.get_child(&key) else { continue };
            let Some(d) = other.get_child(&key) else { continue };
            c.unique_values(&d);
            if c.is_empty() && !c.is_defined() {
                self.clear_child(&key);
            }
        }
    }

    /// Assuming `other` is the target of a future `merge(self)`, records
    /// what would change — the result can later be merged back in to
    /// revert that merge.
    pub fn changes(&self, other: &Node) {
        if self.is_defined() {
            if other.is_defined() {
                let value = other.get();
                if self.get() == value {
                    self.set_value(None);
                } else {
                    self.set_value(Some(value));
                }
            } else {
                self.set_value(None);
            }
        }
        for key in self.child_keys() {
            let Some(c) = self.get_child(&key) else { continue };
            match other.child(&[&key]) {
                None => self.clear_child(&key),
                Some(d) => c.changes(&d),
            }
        }
    }

    /// Depth-first traversal; `visitor` returns `false` to skip recursing
    /// into the current node's children.
    pub fn visit(&self, visitor: &mut impl FnMut(&Node) -> bool) {
        if !visitor(self) {
            return;
        }
        for key in self.child_keys() {
            if let Some(c) = self.get_child(&key) {
                c.visit(visitor);
            }
        }
    }

    /// Deep structural and value comparison.
    pub fn equals(&self, other: &Node) -> bool {
        if Node::ptr_eq(self, other) {
            return true;
        }
        if self.key() != other.key() {
            return false;
        }
        self.equals_recursive(other)
    }

    fn equals_recursive(&self, other: &Node) -> bool {
        if self.is_defined() != other.is_defined() {
            return false;
        }
        if self.get() != other.get() {
            return false;
        }
        if self.size() != other.size() {
            return false;
        }
        self.child_keys().iter().all(|key| {
            other
                .get_child(key)
                .map_or(false, |b| self.get_child(key).unwrap().equals_recursive(&b))
        })
    }

    /// Compares key structure only, ignoring values.
    pub fn structure_equals(&self, other: &Node) -> bool {
        if self.size() != other.size() {
            return false;
        }
        self.child_keys().iter().all(|key| {
            other
                .get_child(key)
                .map_or(false, |b| self.get_child(key).unwrap().structure_equals(&b))
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Node {
    /// M-collation comparison of keys (§3 "Key ordering").
    fn cmp(&self, other: &Self) -> Ordering {
        m_compare(&self.key(), &other.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_leaves_non_overlapping_values_untouched() {
        let a = Node::new_volatile("a");
        a.set_child("x", Some("1".to_string()));
        let b = Node::new_volatile("b");
        b.set_child("y", Some("2".to_string()));
        a.merge(&b);
        assert_eq!(a.get_child("x").unwrap().get(), "1");
        assert_eq!(a.get_child("y").unwrap().get(), "2");
    }

    #[test]
    fn merge_under_never_overwrites_existing_value() {
        let a = Node::new_volatile("a");
        a.set_child("x", Some("keep".to_string()));
        let b = Node::new_volatile("b");
        b.set_child("x", Some("discard".to_string()));
        a.merge_under(&b);
        assert_eq!(a.get_child("x").unwrap().get(), "keep");
    }

    #[test]
    fn unique_nodes_then_merge_with_unique_values_round_trips() {
        let a = Node::new_volatile("root");
        a.set_child("x", Some("1".to_string()));
        a.set_child("shared", Some("same".to_string()));
        let b = Node::new_volatile("root");
        b.set_child("y", Some("2".to_string()));
        b.set_child("shared", Some("same".to_string()));

        let c = Node::new_volatile("c");
        c.merge(&a);
        c.unique_nodes(&b);

        let d = Node::new_volatile("d");
        d.merge(&b);
        d.unique_values(&a);

        a.unique_nodes(&c);
        a.merge(&d);

        assert!(a.equals(&b));
    }

    #[test]
    fn get_flag_defaults_true_unless_literally_zero() {
        let n = Node::new_volatile("n");
        n.set_child("present", None);
        n.set_child("zero", Some("0".to_string()));
        assert!(n.get_flag(&["present"]));
        assert!(!n.get_flag(&["zero"]));
        assert!(!n.get_flag(&["missing"]));
    }

    #[test]
    fn structure_equals_ignores_values() {
        let a = Node::new_volatile("a");
        a.set_child("x", Some("1".to_string()));
        let b = Node::new_volatile("b");
        b.set_child("x", Some("different".to_string()));
        assert!(a.structure_equals(&b));
        assert!(!a.equals(&b));
    }

    #[test]
    fn get_or_default_returns_caller_supplied_default() {
        let n = Node::new_volatile("n");
        n.set_child("count", Some("5".to_string()));
        assert_eq!(n.get_or_default(3i64, &["count"]), 5);
        assert_eq!(n.get_or_default(3i64, &["missing"]), 3);
        assert_eq!(n.get_or_default(1.5f64, &["missing"]), 1.5);
        assert_eq!(
            n.get_or_default("fallback".to_string(), &["missing"]),
            "fallback"
        );
    }

    #[test]
    fn key_path_excludes_the_actual_root_key() {
        let r = Node::new_volatile("r");
        let a = r.set_child("a", None);
        let b = a.set_child("b", None);
        assert_eq!(b.key_path(None), vec!["a", "b"]);
        assert_eq!(b.key_path(Some(&a)), vec!["b"]);
        assert_eq!(r.key_path(None), Vec::<String>::new());
    }
}
