//! Boundary behaviors called out explicitly: quoted keys with embedded
//! colons, the undefined/empty-string distinction, multi-line block text,
//! and filesystem-unsafe key sanitization (§4.6, §4.5).

use n2a_store::{document, group};

#[test]
fn key_containing_a_colon_round_trips_through_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");

    let doc = document::standalone(&path);
    doc.set_child("a:b", Some("value".to_string()));
    doc.save();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"a:b\":value"));

    let reopened = document::standalone(&path);
    assert_eq!(reopened.get_child("a:b").unwrap().get_value().unwrap(), "value");
}

#[test]
fn undefined_child_is_distinct_from_empty_string_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");

    let doc = document::standalone(&path);
    doc.set_child("undefined", None);
    doc.set_child("empty", Some(String::new()));
    doc.save();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("undefined\n"));
    assert!(contents.contains("empty:\n"));

    let reopened = document::standalone(&path);
    assert!(!reopened.get_child("undefined").unwrap().is_defined());
    assert!(reopened.get_child("empty").unwrap().is_defined());
    assert_eq!(reopened.get_child("empty").unwrap().get_value().unwrap(), "");
}

#[test]
fn multi_line_value_round_trips_as_block_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");

    let doc = document::standalone(&path);
    doc.set_child("description", Some("first line\nsecond line\nthird".to_string()));
    doc.save();

    let reopened = document::standalone(&path);
    assert_eq!(
        reopened.get_child("description").unwrap().get_value().unwrap(),
        "first line\nsecond line\nthird"
    );
}

#[test]
fn directory_group_sanitizes_reserved_filenames_when_asked() {
    assert_eq!(group::sanitize_filename("CON"), "CON_");
    assert_eq!(group::sanitize_filename("lpt1"), "lpt1_");
    assert_eq!(group::sanitize_filename("a/b:c"), "a-b-c");
    assert_eq!(group::sanitize_filename("normal_name"), "normal_name");
}
