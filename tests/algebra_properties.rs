//! Property and boundary tests for the merge/diff algebra (§4.7, §4.8) and
//! M collation (§3), run against plain volatile trees so they exercise only
//! the algebra, never the disk-backed flavours.

use n2a_store::Node;
use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;

/// A small, bounded key/value tree, arbitrary enough to generate interesting
/// shapes without blowing up quickcheck's shrinking.
#[derive(Clone, Debug)]
struct SmallTree(Vec<(String, String)>);

impl Arbitrary for SmallTree {
    fn arbitrary(g: &mut Gen) -> Self {
        let keys = ["a", "b", "c"];
        let len = u8::arbitrary(g) % 4;
        let mut entries = Vec::new();
        for _ in 0..len {
            let key = keys[(u8::arbitrary(g) as usize) % keys.len()].to_string();
            let value = (u8::arbitrary(g) % 10).to_string();
            entries.push((key, value));
        }
        SmallTree(entries)
    }
}

fn build(entries: &[(String, String)]) -> Node {
    let root = Node::new_volatile("root");
    for (key, value) in entries {
        root.set_child(key, Some(value.clone()));
    }
    root
}

#[quickcheck]
fn unique_nodes_then_merge_with_unique_values_round_trips(a: SmallTree, b: SmallTree) -> TestResult {
    let tree_a = build(&a.0);
    let tree_b = build(&b.0);

    let c = Node::new_volatile("root");
    c.merge(&tree_a);
    c.unique_nodes(&tree_b);

    let d = Node::new_volatile("root");
    d.merge(&tree_b);
    d.unique_values(&tree_a);

    tree_a.unique_nodes(&c);
    tree_a.merge(&d);

    TestResult::from_bool(tree_a.equals(&tree_b))
}

#[quickcheck]
fn changes_against_an_identical_copy_is_a_merge_no_op(a: SmallTree) -> bool {
    let tree = build(&a.0);
    let copy = Node::new_volatile("root");
    copy.merge(&tree);

    let diff = Node::new_volatile("root");
    diff.merge(&tree);
    diff.changes(&copy);

    let target = Node::new_volatile("root");
    target.merge(&copy);
    target.merge(&diff);
    target.equals(&tree)
}

#[test]
fn merge_never_overwrites_an_existing_value() {
    let root = Node::new_volatile("root");
    root.set_child("a", Some("original".to_string()));

    let incoming = Node::new_volatile("incoming");
    incoming.set_child("a", Some("replacement".to_string()));
    incoming.set_child("b", Some("new".to_string()));

    root.merge(&incoming);
    assert_eq!(root.get_child("a").unwrap().get_value().unwrap(), "original");
    assert_eq!(root.get_child("b").unwrap().get_value().unwrap(), "new");
}

#[test]
fn merge_under_never_overwrites_existing_value_either() {
    let root = Node::new_volatile("root");
    root.set_child("a", Some("original".to_string()));

    let fallback = Node::new_volatile("fallback");
    fallback.set_child("a", Some("ignored".to_string()));
    fallback.set_child("b", Some("default".to_string()));

    root.merge_under(&fallback);
    assert_eq!(root.get_child("a").unwrap().get_value().unwrap(), "original");
    assert_eq!(root.get_child("b").unwrap().get_value().unwrap(), "default");
}

#[test]
fn get_flag_defaults_true_unless_literally_zero() {
    let root = Node::new_volatile("root");
    assert!(!root.get_flag(&["absent"]));

    root.set_child("enabled", Some("anything".to_string()));
    assert!(root.get_flag(&["enabled"]));

    root.set_child("disabled", Some("0".to_string()));
    assert!(!root.get_flag(&["disabled"]));
}

#[test]
fn children_iterate_in_m_collation_order() {
    let root = Node::new_volatile("root");
    for key in ["abc", "10", "2", "9", "1a"] {
        root.set_child(key, None);
    }
    assert_eq!(root.child_keys(), vec!["2", "9", "10", "1a", "abc"]);
}
