//! End-to-end exercises of the disk-backed flavours: lazy loading, dirty
//! propagation into a group's write queue, directory scanning, and moving a
//! document across keys (§4.4, §4.5, §4.7).

use n2a_store::{document, group, Node};
use rstest::rstest;

fn read_file(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn standalone_document_saves_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.txt");

    let doc = document::standalone(&path);
    doc.set_child("dt", Some("0.001".to_string()));
    doc.set_child("name", Some("M0".to_string()));
    assert!(doc.needs_write());
    doc.save();
    assert!(!doc.needs_write());
    assert!(path.exists());

    let reopened = document::standalone(&path);
    assert_eq!(reopened.get_child("dt").unwrap().get_value().unwrap(), "0.001");
    assert_eq!(reopened.get_child("name").unwrap().get_value().unwrap(), "M0");
}

#[test]
fn directory_group_scans_existing_entries_and_saves_new_ones() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("existing")).unwrap();
    std::fs::write(
        dir.path().join("existing/M0"),
        "N2A.schema=3\nnote:hand written\n",
    )
    .unwrap();

    let models = group::directory("models", dir.path(), Some("M0".to_string()));
    assert_eq!(models.child_keys(), vec!["existing"]);

    let existing = models.get_child("existing").unwrap();
    assert_eq!(existing.get_child("note").unwrap().get_value().unwrap(), "hand written");

    let fresh = models.set_child("M1", None);
    fresh.set_child("note", Some("new".to_string()));
    assert!(models.child_keys().contains(&"M1".to_string()));
    models.save();

    let path = dir.path().join("M1/M0");
    assert!(path.exists());
    assert!(read_file(&path).contains("note:new"));
}

#[test]
fn moving_a_grouped_document_renames_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let models = group::directory("models", dir.path(), None);
    let child = models.set_child("old", None);
    child.set_child("note", Some("hi".to_string()));
    models.save();
    assert!(dir.path().join("old").exists());

    models.move_child("old", "new");
    assert!(!dir.path().join("old").exists());
    assert!(dir.path().join("new").exists());
}

#[rstest]
#[case("")]
#[case("has a note")]
fn clearing_a_group_entry_deletes_its_backing_file(#[case] note: &str) {
    let dir = tempfile::tempdir().unwrap();
    let models = group::directory("models", dir.path(), None);
    let child = models.set_child("m", None);
    if !note.is_empty() {
        child.set_child("note", Some(note.to_string()));
    }
    models.save();
    assert!(dir.path().join("m").exists());

    models.clear_child("m");
    assert!(!dir.path().join("m").exists());
}

#[test]
fn notify_child_changed_forces_next_access_to_reload_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let models = group::directory("models", dir.path(), None);
    let child = models.set_child("m", None);
    child.set_child("note", Some("before".to_string()));
    models.save();

    // Simulate an out-of-band edit, like a VCS checkout.
    std::fs::write(dir.path().join("m"), "N2A.schema=3\nnote:after\n").unwrap();
    models.notify_child_changed("m");

    let reloaded = models.get_child("m").unwrap();
    assert_eq!(reloaded.get_child("note").unwrap().get_value().unwrap(), "after");
}

#[test]
fn empty_node_reports_default_path_none_for_non_documents() {
    let root = Node::new_volatile("root");
    assert!(root.path().is_none());
}
