//! Document groups and directories (C5, §4.5).
//!
//! A group holds no children directly; `cache` is a *weak* map from key to
//! document, and `write_queue` is a *strong* list of documents waiting to
//! be flushed. The weak/strong split is what lets an unreferenced clean
//! document be collected while guaranteeing a dirty one survives until
//! `save` runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use crate::collation::CollKey;
use std::cell::RefCell;

use crate::node::{DocumentMeta, GroupData, GroupMode, Node, Role, TreeData};

/// A group whose keys are full paths: `pathForDoc` is the identity.
pub fn free(key: impl Into<String>) -> Node {
    Node::Group(Rc::new(RefCell::new(GroupData {
        key: key.into(),
        parent: None,
        mode: GroupMode::Free,
        cache: BTreeMap::new(),
        write_queue: Vec::new(),
        scanned: true,
    })))
}

/// A group backed by a directory: each child is a file (or, with `suffix`,
/// a same-named file inside a subdirectory) directly under `root`.
pub fn directory(key: impl Into<String>, root: impl Into<PathBuf>, suffix: Option<String>) -> Node {
    let root = root.into();
    let _ = std::fs::create_dir_all(&root);
    Node::Group(Rc::new(RefCell::new(GroupData {
        key: key.into(),
        parent: None,
        mode: GroupMode::Directory { root, suffix },
        cache: BTreeMap::new(),
        write_queue: Vec::new(),
        scanned: false,
    })))
}

/// Replaces forbidden filesystem characters and dodges Windows' reserved
/// device names (§4.5 "Filename sanitization").
pub fn sanitize_filename(name: &str) -> String {
    const FORBIDDEN: &[char] = &['\\', '/', ':', '*', '"', '<', '>', '|'];
    let mut out: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '-' } else { c })
        .collect();
    let upper = out.to_ascii_uppercase();
    let reserved = matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL")
        || (upper.len() == 4
            && (upper.starts_with("LPT") || upper.starts_with("COM"))
            && upper.as_bytes()[3].is_ascii_digit());
    if reserved {
        out.push('_');
    }
    out
}

pub(crate) fn path_for_doc(rc: &Rc<RefCell<GroupData>>, key: &str) -> PathBuf {
    match &rc.borrow().mode {
        GroupMode::Free => PathBuf::from(key),
        GroupMode::Directory { root, suffix } => {
            let mut p = root.join(key);
            if let Some(s) = suffix {
                p = p.join(s);
            }
            p
        }
    }
}

pub(crate) fn path_for_file(rc: &Rc<RefCell<GroupData>>, key: &str) -> PathBuf {
    match &rc.borrow().mode {
        GroupMode::Free => PathBuf::from(key),
        GroupMode::Directory { root, .. } => root.join(key),
    }
}

pub(crate) fn group_value(rc: &Rc<RefCell<GroupData>>) -> String {
    match &rc.borrow().mode {
        GroupMode::Free => String::new(),
        GroupMode::Directory { root, .. } => root.to_string_lossy().into_owned(),
    }
}

pub(crate) fn set_group_value(rc: &Rc<RefCell<GroupData>>, value: Option<String>) {
    let is_dir = matches!(rc.borrow().mode, GroupMode::Directory { .. });
    if !is_dir {
        return;
    }
    save(rc);
    if let Some(v) = value {
        if let GroupMode::Directory { root, .. } = &mut rc.borrow_mut().mode {
            *root = PathBuf::from(v);
        }
    }
}

pub(crate) fn ensure_scanned(rc: &Rc<RefCell<GroupData>>) {
    let (needs_scan, is_dir) = {
        let data = rc.borrow();
        (!data.scanned, matches!(data.mode, GroupMode::Directory { .. }))
    };
    if !needs_scan {
        return;
    }
    if is_dir {
        scan_directory(rc);
    } else {
        rc.borrow_mut().scanned = true;
    }
}

fn scan_directory(rc: &Rc<RefCell<GroupData>>) {
    let (root, suffix) = match &rc.borrow().mode {
        GroupMode::Directory { root, suffix } => (root.clone(), suffix.clone()),
        GroupMode::Free => return,
    };
    let _ = std::fs::create_dir_all(&root);
    let mut new_cache: BTreeMap<CollKey, Weak<RefCell<TreeData>>> = BTreeMap::new();
    if let Ok(entries) = std::fs::read_dir(&root) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue; // allow e.g. a git repo to share the directory
            }
            if suffix.is_some() {
                let is_dir_entry = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir_entry {
                    continue;
                }
            }
            let existing = rc
                .borrow()
                .cache
                .get(&CollKey(name.clone()))
                .cloned()
                .unwrap_or_else(Weak::new);
            new_cache.insert(CollKey(name), existing);
        }
    }
    // Brand-new documents that have not yet been flushed still need to be
    // visible, even though the scan above cannot see them.
    let queued: Vec<(String, Weak<RefCell<TreeData>>)> = {
        let data = rc.borrow();
        data.write_queue
            .iter()
            .map(|d| (d.borrow().key.clone(), Rc::downgrade(d)))
            .collect()
    };
    for (key, weak) in queued {
        new_cache.entry(CollKey(key)).or_insert(weak);
    }
    let mut data = rc.borrow_mut();
    data.cache = new_cache;
    data.scanned = true;
}

pub(crate) fn get_child(rc: &Rc<RefCell<GroupData>>, key: &str) -> Option<Node> {
    if key.is_empty() {
        return None;
    }
    ensure_scanned(rc);
    let ck = CollKey(key.to_string());
    if !rc.borrow().cache.contains_key(&ck) {
        return None;
    }
    let existing = rc.borrow().cache.get(&ck).and_then(Weak::upgrade);
    if let Some(child_rc) = existing {
        return Some(Node::Tree(child_rc));
    }
    materialize(rc, key)
}

fn materialize(rc: &Rc<RefCell<GroupData>>, key: &str) -> Option<Node> {
    let doc_path = path_for_doc(rc, key);
    let allow_missing_suffix =
        matches!(&rc.borrow().mode, GroupMode::Directory { suffix: Some(_), .. });
    if !doc_path.exists() {
        if !allow_missing_suffix {
            return None;
        }
        // A directory entry may exist without its suffix file yet.
        if !doc_path.parent().map(Path::exists).unwrap_or(false) {
            return None;
        }
    }
    Some(new_document_child(rc, key))
}

fn new_document_child(rc: &Rc<RefCell<GroupData>>, key: &str) -> Node {
    let self_node = Node::Group(rc.clone());
    let child_rc = Rc::new(RefCell::new(TreeData {
        key: key.to_string(),
        parent: Some(self_node.weak()),
        value: None,
        children: BTreeMap::new(),
        dirty: false,
        role: Role::Document(DocumentMeta { loaded: false }),
    }));
    rc.borrow_mut()
        .cache
        .insert(CollKey(key.to_string()), Rc::downgrade(&child_rc));
    Node::Tree(child_rc)
}

pub(crate) fn set_child(rc: &Rc<RefCell<GroupData>>, key: &str) -> Node {
    if let Some(existing) = get_child(rc, key) {
        return existing;
    }
    let is_dir = matches!(rc.borrow().mode, GroupMode::Directory { .. });
    let doc_path = path_for_doc(rc, key);
    let child_node = new_document_child(rc, key);
    let child_rc = match &child_node {
        Node::Tree(t) => t.clone(),
        Node::Group(_) => unreachable!("new_document_child always returns a Tree"),
    };
    // A directory doc always queues for its first save; a free-group doc
    // only queues if nothing is on disk at that path yet.
    if is_dir || !doc_path.exists() {
        crate::document::mark_changed(&child_rc);
    }
    child_node
}

pub(crate) fn clear_child(rc: &Rc<RefCell<GroupData>>, key: &str) {
    let ck = CollKey(key.to_string());
    let removed_weak = rc.borrow_mut().cache.remove(&ck);
    if let Some(weak) = removed_weak {
        if let Some(strong) = weak.upgrade() {
            rc.borrow_mut()
                .write_queue
                .retain(|d| !Rc::ptr_eq(d, &strong));
        }
    }
    delete_tree(&path_for_file(rc, key));
}

fn delete_tree(path: &Path) {
    if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                delete_tree(&entry.path());
            }
        }
        let _ = std::fs::remove_dir(path);
    } else {
        let _ = std::fs::remove_file(path);
    }
}

/// Forgets every cached document; a directory additionally deletes its
/// entire subtree from disk (§4.5 "clear").
pub(crate) fn clear(rc: &Rc<RefCell<GroupData>>) {
    let dir_root = match &rc.borrow().mode {
        GroupMode::Directory { root, .. } => Some(root.clone()),
        GroupMode::Free => None,
    };
    {
        let mut data = rc.borrow_mut();
        data.cache.clear();
        data.write_queue.clear();
    }
    if let Some(root) = dir_root {
        delete_tree(&root);
    }
}

pub(crate) fn enqueue(rc: &Rc<RefCell<GroupData>>, doc: Rc<RefCell<TreeData>>) {
    let mut data = rc.borrow_mut();
    if !data.write_queue.iter().any(|d| Rc::ptr_eq(d, &doc)) {
        data.write_queue.push(doc);
    }
}

/// Flushes every queued document to disk, releasing the strong references
/// once written (§4.5 "save").
pub(crate) fn save(rc: &Rc<RefCell<GroupData>>) {
    let queue = std::mem::take(&mut rc.borrow_mut().write_queue);
    for doc in &queue {
        crate::document::save_document(doc);
    }
}

/// Renames a member on disk. If the caller already holds a reference to
/// the document named by `from_key`, it remains valid afterward (§4.5
/// "move").
pub(crate) fn move_child(rc: &Rc<RefCell<GroupData>>, from_key: &str, to_key: &str) {
    if from_key == to_key {
        return;
    }
    save(rc);
    let from_path = path_for_file(rc, from_key);
    let to_path = path_for_file(rc, to_key);
    if to_path.exists() {
        delete_tree(&to_path);
    }
    if let Err(e) = std::fs::rename(&from_path, &to_path) {
        crate::diagnostics::report(format!(
            "failed to move {} --> {}: {e}",
            from_path.display(),
            to_path.display()
        ));
    }
    let mut data = rc.borrow_mut();
    data.cache.remove(&CollKey(to_key.to_string()));
    if let Some(weak) = data.cache.remove(&CollKey(from_key.to_string())) {
        if let Some(strong) = weak.upgrade() {
            strong.borrow_mut().key = to_key.to_string();
        }
        data.cache.insert(CollKey(to_key.to_string()), weak);
    }
}

/// Synchronizes with a change made directly on disk (e.g. by a VCS
/// checkout), clearing any in-memory state for `key` so the next access
/// re-reads it (§4.5 "node changed").
pub(crate) fn node_changed(rc: &Rc<RefCell<GroupData>>, key: &str) {
    if key.is_empty() {
        return;
    }
    let doc_path = path_for_doc(rc, key);
    if !doc_path.exists() {
        rc.borrow_mut().cache.remove(&CollKey(key.to_string()));
        return;
    }
    let existing = rc
        .borrow()
        .cache
        .get(&CollKey(key.to_string()))
        .and_then(Weak::upgrade);
    match existing {
        None => {
            new_document_child(rc, key);
        }
        Some(child_rc) => reset_for_reload(&child_rc),
    }
}

/// Forces a full directory rescan, preserving identity of already-cached
/// documents as much as possible (§4.5 "reload").
pub(crate) fn reload(rc: &Rc<RefCell<GroupData>>) {
    rc.borrow_mut().scanned = false;
    ensure_scanned(rc);
    let live: Vec<Rc<RefCell<TreeData>>> =
        rc.borrow().cache.values().filter_map(Weak::upgrade).collect();
    for child_rc in live {
        reset_for_reload(&child_rc);
    }
}

fn reset_for_reload(child_rc: &Rc<RefCell<TreeData>>) {
    let mut data = child_rc.borrow_mut();
    data.dirty = false;
    data.children.clear();
    if let Role::Document(meta) = &mut data.role {
        meta.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_forbidden_characters() {
        assert_eq!(sanitize_filename("a/b:c"), "a-b-c");
    }

    #[test]
    fn sanitizes_windows_reserved_names() {
        assert_eq!(sanitize_filename("CON"), "CON_");
        assert_eq!(sanitize_filename("com1"), "COM1_");
        assert_eq!(sanitize_filename("COMET"), "COMET");
        assert_eq!(sanitize_filename("model"), "model");
    }
}
