//! Dirty tracking (C3) and document lazy-load/save/delete (C4), §4.3–§4.4.
//!
//! These free functions operate on the `Tree` backing of [`Node`] and are
//! the only place that understands the difference between a plain volatile
//! tree, a dirty-tracking tree, and a document bound to a file — the
//! distinction lives entirely in [`Role`], not in separate types, so the
//! derived algebra in [`crate::algebra`] never has to know about it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::rc::Rc;

use crate::collation::CollKey;
use crate::node::{DocumentMeta, Node, Role, TreeData, WeakNode};
use crate::value::Value;

fn is_tracked(role: &Role) -> bool {
    !matches!(role, Role::Volatile)
}

/// Creates a stand-alone document: its value *is* its path on disk, and
/// `set_value` renames the underlying file (§4.4 "Set-value-on-document").
pub fn standalone(path: impl Into<PathBuf>) -> Node {
    let path_buf = path.into();
    let path_str = path_buf.to_string_lossy().into_owned();
    Node::Tree(Rc::new(RefCell::new(TreeData {
        key: String::new(),
        parent: None,
        value: Some(Value::Str(path_str)),
        children: BTreeMap::new(),
        dirty: false,
        role: Role::Document(DocumentMeta { loaded: false }),
    })))
}

/// The file this document reads from / writes to, whether stand-alone or a
/// member of a group. `None` for non-document nodes.
pub fn path(node: &Node) -> Option<PathBuf> {
    match node {
        Node::Tree(rc) if matches!(rc.borrow().role, Role::Document(_)) => Some(document_path(rc)),
        _ => None,
    }
}

fn document_path(rc: &Rc<RefCell<TreeData>>) -> PathBuf {
    let data = rc.borrow();
    if let Some(Node::Group(group)) = data.parent.as_ref().and_then(WeakNode::upgrade) {
        crate::group::path_for_doc(&group, &data.key)
    } else {
        data.value
            .as_ref()
            .map(|v| PathBuf::from(v.to_value_string()))
            .unwrap_or_default()
    }
}

/// Triggers a load if this is an unloaded document; a no-op otherwise.
/// Called from every structural primitive (`get_child`, `size`,
/// `child_keys`, `clear_child`) so that first access is what loads a
/// document (§4.4 "Lazy load").
pub(crate) fn ensure_loaded(rc: &Rc<RefCell<TreeData>>) {
    let needs_load = matches!(&rc.borrow().role, Role::Document(meta) if !meta.loaded);
    if needs_load {
        load(rc);
    }
}

fn load(rc: &Rc<RefCell<TreeData>>) {
    let path = document_path(rc);
    {
        // Lie about being dirty, the way the original does: this prevents
        // the child insertions performed by the parser from re-enqueuing
        // this document onto its group's write queue while it is merely
        // being populated from disk.
        let mut data = rc.borrow_mut();
        if let Role::Document(meta) = &mut data.role {
            meta.loaded = true;
        }
        data.dirty = true;
    }
    match std::fs::File::open(&path) {
        Ok(file) => {
            let mut reader = BufReader::new(file);
            let root = Node::Tree(rc.clone());
            if let Err(e) = crate::schema::read_all(&root, &mut reader) {
                crate::diagnostics::report(format!(
                    "failed to parse {}: {e}",
                    path.display()
                ));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // Brand-new document: an empty tree is the correct result.
        }
        Err(e) => {
            crate::diagnostics::report(format!("failed to open {}: {e}", path.display()));
        }
    }
    clear_changed(rc);
}

/// Resets `dirty` on this node and every descendant (§4.3 `clear_changed`).
pub(crate) fn clear_changed(rc: &Rc<RefCell<TreeData>>) {
    let children: Vec<Node> = {
        let mut data = rc.borrow_mut();
        data.dirty = false;
        data.children.values().cloned().collect()
    };
    for child in children {
        if let Node::Tree(crc) = child {
            clear_changed(&crc);
        }
    }
}

/// Sets `dirty` on this node and propagates it upward through persistent
/// ancestors (§3 invariant 4), registering documents on their group's
/// write queue along the way.
pub(crate) fn mark_changed(rc: &Rc<RefCell<TreeData>>) {
    let (already_dirty, tracked) = {
        let data = rc.borrow();
        (data.dirty, is_tracked(&data.role))
    };
    if !tracked || already_dirty {
        return;
    }
    let parent = {
        let mut data = rc.borrow_mut();
        data.dirty = true;
        data.parent.clone()
    };
    let is_doc = matches!(rc.borrow().role, Role::Document(_));
    if is_doc {
        if let Some(Node::Group(group)) = parent.as_ref().and_then(WeakNode::upgrade) {
            crate::group::enqueue(&group, rc.clone());
        }
    }
    if let Some(Node::Tree(prc)) = parent.and_then(|w| w.upgrade()) {
        mark_changed(&prc);
    }
}

pub(crate) fn set_value(rc: &Rc<RefCell<TreeData>>, new_value: Option<Value>) {
    let is_doc = matches!(rc.borrow().role, Role::Document(_));
    if is_doc {
        let has_group_parent = matches!(
            rc.borrow().parent.as_ref().and_then(WeakNode::upgrade),
            Some(Node::Group(_))
        );
        if has_group_parent {
            // A grouped document's value is derived from the group's path
            // mapping; setting it directly is a no-op (§4.4).
            return;
        }
        rename_standalone(rc, new_value);
        return;
    }

    let changed = {
        let mut data = rc.borrow_mut();
        if data.value == new_value {
            false
        } else {
            data.value = new_value;
            true
        }
    };
    if changed {
        mark_changed(rc);
    }
}

fn rename_standalone(rc: &Rc<RefCell<TreeData>>, new_value: Option<Value>) {
    let new_path_str = match &new_value {
        Some(v) => v.to_value_string(),
        None => return,
    };
    let old_path_str = rc.borrow().value.as_ref().map(Value::to_value_string);
    if old_path_str.as_deref() == Some(new_path_str.as_str()) {
        return;
    }
    if let Some(old) = &old_path_str {
        match std::fs::rename(old, &new_path_str) {
            Ok(()) => rc.borrow_mut().value = Some(Value::Str(new_path_str)),
            Err(e) => crate::diagnostics::report(format!(
                "failed to move file: {old} --> {new_path_str}: {e}"
            )),
        }
    } else {
        rc.borrow_mut().value = Some(Value::Str(new_path_str));
    }
}

pub(crate) fn set_child(
    rc: &Rc<RefCell<TreeData>>,
    self_node: &Node,
    key: &str,
    value: Option<Value>,
) -> Node {
    ensure_loaded(rc);
    let existing = rc.borrow().children.get(&CollKey(key.to_string())).cloned();
    if let Some(child) = existing {
        if let Node::Tree(crc) = &child {
            set_value(crc, value);
        }
        return child;
    }

    let child_role = match &rc.borrow().role {
        Role::Volatile => Role::Volatile,
        _ => Role::Persistent,
    };
    let child_rc = Rc::new(RefCell::new(TreeData {
        key: key.to_string(),
        parent: Some(self_node.weak()),
        value,
        children: BTreeMap::new(),
        dirty: false,
        role: child_role,
    }));
    let child_node = Node::Tree(child_rc.clone());
    rc.borrow_mut()
        .children
        .insert(CollKey(key.to_string()), child_node.clone());
    if is_tracked(&rc.borrow().role) {
        mark_changed(&child_rc);
    }
    child_node
}

pub(crate) fn clear_child(rc: &Rc<RefCell<TreeData>>, key: &str) {
    ensure_loaded(rc);
    let removed = rc.borrow_mut().children.remove(&CollKey(key.to_string()));
    if removed.is_some() && is_tracked(&rc.borrow().role) {
        mark_changed(rc);
    }
}

/// In-place key swap preserving the child's identity (§4.7 "move",
/// `MPersistent.move`). Any previous occupant of `to_key` is simply
/// dropped from the map, not recursively cleared — there is nothing else
/// to clean up for an in-memory tree.
pub(crate) fn move_child(rc: &Rc<RefCell<TreeData>>, from_key: &str, to_key: &str) {
    if from_key == to_key {
        return;
    }
    let to_ck = CollKey(to_key.to_string());
    let from_ck = CollKey(from_key.to_string());
    rc.borrow_mut().children.remove(&to_ck);
    let source = rc.borrow_mut().children.remove(&from_ck);
    if let Some(child) = source {
        if let Node::Tree(crc) = &child {
            crc.borrow_mut().key = to_key.to_string();
            rc.borrow_mut().children.insert(to_ck, child.clone());
            mark_changed(crc);
        }
    }
}

/// Flushes a dirty document to disk; a no-op if clean (§4.4 "Save").
pub fn save(node: &Node) {
    if let Node::Tree(rc) = node {
        if matches!(rc.borrow().role, Role::Document(_)) {
            save_document(rc);
        }
    }
}

pub(crate) fn save_document(rc: &Rc<RefCell<TreeData>>) {
    if !rc.borrow().dirty {
        return;
    }
    let path = document_path(rc);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent_dir) {
                crate::diagnostics::report(format!(
                    "failed to create directory {}: {e}",
                    parent_dir.display()
                ));
                return;
            }
        }
    }
    match std::fs::File::create(&path) {
        Ok(file) => {
            let mut writer = BufWriter::new(file);
            let root = Node::Tree(rc.clone());
            if let Err(e) = crate::schema::write_all(&root, &mut writer) {
                crate::diagnostics::report(format!("failed to write {}: {e}", path.display()));
                return;
            }
            clear_changed(rc);
        }
        Err(e) => {
            crate::diagnostics::report(format!("failed to write {}: {e}", path.display()));
        }
    }
}

/// Removes this document from persistent storage. Standalone documents
/// delete their own file; grouped documents delegate to the group's
/// `clear_child`, which also deletes any sibling files under the entry
/// (§4.4 "Delete").
pub fn delete(node: &Node) {
    let rc = match node {
        Node::Tree(rc) if matches!(rc.borrow().role, Role::Document(_)) => rc,
        _ => return,
    };
    let parent = rc.borrow().parent.as_ref().and_then(WeakNode::upgrade);
    match parent {
        Some(Node::Group(group)) => {
            let key = rc.borrow().key.clone();
            crate::group::clear_child(&group, &key);
        }
        _ => {
            let path = document_path(rc);
            if let Err(e) = std::fs::remove_file(&path) {
                crate::diagnostics::report(format!(
                    "failed to delete file {}: {e}",
                    path.display()
                ));
            }
        }
    }
}
