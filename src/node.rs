//! The node representation and its primitive operations (C1, §4.1).
//!
//! Rather than an inheritance chain (MNode → MVolatile → MPersistent → MDoc;
//! MDocGroup; MDir), this crate follows a capability-set design (see
//! `DESIGN.md`): [`Node`] is one of two backings —
//!
//! - [`Node::Tree`] covers the volatile (C2), dirty-tracking (C3) and
//!   document (C4) flavours, which all share the same shape (a value, an
//!   ordered map of children, a dirty bit) and differ only in what
//!   `set_value`/`mark_changed` do.
//! - [`Node::Group`] covers the document group and directory (C5), which
//!   hold a *weak* cache of documents plus a *strong* write queue rather
//!   than owning children directly.
//!
//! Everything derived from these primitives (merge, diff, move, visit,
//! comparisons, path operations) lives in [`crate::algebra`] and is
//! implemented exactly once, against this enum.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::collation::CollKey;
use crate::value::Value;

/// A node in the store. Cheap to clone — it is a reference-counted handle.
#[derive(Clone)]
pub enum Node {
    Tree(Rc<RefCell<TreeData>>),
    Group(Rc<RefCell<GroupData>>),
}

#[derive(Clone)]
pub(crate) enum WeakNode {
    Tree(Weak<RefCell<TreeData>>),
    Group(Weak<RefCell<GroupData>>),
}

impl WeakNode {
    pub(crate) fn upgrade(&self) -> Option<Node> {
        match self {
            WeakNode::Tree(w) => w.upgrade().map(Node::Tree),
            WeakNode::Group(w) => w.upgrade().map(Node::Group),
        }
    }

    pub(crate) fn from_node(node: &Node) -> Self {
        match node {
            Node::Tree(rc) => WeakNode::Tree(Rc::downgrade(rc)),
            Node::Group(rc) => WeakNode::Group(Rc::downgrade(rc)),
        }
    }
}

/// Distinguishes the volatile/dirty-tracking/document flavours that share
/// [`TreeData`]'s shape (C2/C3/C4).
pub(crate) enum Role {
    /// C2: no dirty tracking at all.
    Volatile,
    /// C3: mutations mark `dirty` and propagate to persistent ancestors.
    Persistent,
    /// C4: a `Persistent` tree additionally bound to a file.
    Document(DocumentMeta),
}

pub(crate) struct DocumentMeta {
    pub(crate) loaded: bool,
}

/// Backing storage shared by the volatile, dirty-tracking and document
/// node flavours.
pub struct TreeData {
    pub(crate) key: String,
    pub(crate) parent: Option<WeakNode>,
    pub(crate) value: Option<Value>,
    pub(crate) children: BTreeMap<CollKey, Node>,
    pub(crate) dirty: bool,
    pub(crate) role: Role,
}

/// How a [`GroupData`] maps a key to a path on disk (§4.5).
pub(crate) enum GroupMode {
    /// The key is literally the document's path.
    Free,
    /// The key is a file or subdirectory name under `root`.
    Directory {
        root: PathBuf,
        suffix: Option<String>,
    },
}

/// Backing storage for a document group / directory (C5).
///
/// `cache` holds *weak* references (a dead or never-materialised entry is
/// `Weak::new()`); `write_queue` holds *strong* references, which is what
/// keeps a dirty, otherwise-unreferenced document alive until it is saved.
pub struct GroupData {
    pub(crate) key: String,
    pub(crate) parent: Option<WeakNode>,
    pub(crate) mode: GroupMode,
    pub(crate) cache: BTreeMap<CollKey, Weak<RefCell<TreeData>>>,
    pub(crate) write_queue: Vec<Rc<RefCell<TreeData>>>,
    /// For a directory: whether the on-disk scan has run yet.
    pub(crate) scanned: bool,
}

impl Node {
    /// A detached, empty volatile node — used by `child_or_empty` for safe
    /// iteration over an absent subtree, and as scratch storage by the
    /// diffing operations.
    pub fn empty() -> Node {
        Node::Tree(Rc::new(RefCell::new(TreeData {
            key: String::new(),
            parent: None,
            value: None,
            children: BTreeMap::new(),
            dirty: false,
            role: Role::Volatile,
        })))
    }

    /// A fresh, unattached volatile node with the given key.
    pub fn new_volatile(key: impl Into<String>) -> Node {
        Node::Tree(Rc::new(RefCell::new(TreeData {
            key: key.into(),
            parent: None,
            value: None,
            children: BTreeMap::new(),
            dirty: false,
            role: Role::Volatile,
        })))
    }

    pub(crate) fn weak(&self) -> WeakNode {
        WeakNode::from_node(self)
    }

    /// Identity comparison: do these two handles refer to the same
    /// underlying node (as opposed to two nodes that merely share a key)?
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Tree(x), Node::Tree(y)) => Rc::ptr_eq(x, y),
            (Node::Group(x), Node::Group(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    // ----- primitives (C1) -----

    pub fn key(&self) -> String {
        match self {
            Node::Tree(rc) => rc.borrow().key.clone(),
            Node::Group(rc) => rc.borrow().key.clone(),
        }
    }

    pub fn parent(&self) -> Option<Node> {
        match self {
            Node::Tree(rc) => rc.borrow().parent.as_ref().and_then(WeakNode::upgrade),
            Node::Group(rc) => rc.borrow().parent.as_ref().and_then(WeakNode::upgrade),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Node::Tree(rc) => {
                crate::document::ensure_loaded(rc);
                rc.borrow().children.len()
            }
            Node::Group(rc) => {
                crate::group::ensure_scanned(rc);
                rc.borrow().cache.len()
            }
        }
    }

    pub fn is_defined(&self) -> bool {
        match self {
            Node::Tree(rc) => rc.borrow().value.is_some(),
            Node::Group(_) => true,
        }
    }

    pub fn get_value(&self) -> Option<String> {
        match self {
            Node::Tree(rc) => {
                let data = rc.borrow();
                if matches!(data.role, Role::Document(_)) {
                    if let Some(Node::Group(group)) =
                        data.parent.as_ref().and_then(WeakNode::upgrade)
                    {
                        return Some(
                            crate::group::path_for_doc(&group, &data.key)
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                data.value.as_ref().map(Value::to_value_string)
            }
            Node::Group(rc) => Some(crate::group::group_value(rc)),
        }
    }

    /// Returns the typed payload directly, without stringifying (C2
    /// `get_object`).
    pub fn get_object(&self) -> Option<Value> {
        match self {
            Node::Tree(rc) => rc.borrow().value.clone(),
            Node::Group(_) => None,
        }
    }

    pub fn set_value(&self, value: Option<String>) {
        match self {
            Node::Tree(rc) => crate::document::set_value(rc, value.map(Value::Str)),
            Node::Group(rc) => crate::group::set_group_value(rc, value),
        }
    }

    /// Sets the typed payload directly (C2 `setObject`).
    pub fn set_object(&self, value: Option<Value>) {
        if let Node::Tree(rc) = self {
            crate::document::set_value(rc, value);
        }
    }

    pub fn get_child(&self, key: &str) -> Option<Node> {
        match self {
            Node::Tree(rc) => {
                crate::document::ensure_loaded(rc);
                rc.borrow().children.get(&CollKey(key.to_string())).cloned()
            }
            Node::Group(rc) => crate::group::get_child(rc, key),
        }
    }

    pub fn set_child(&self, key: &str, value: Option<String>) -> Node {
        match self {
            Node::Tree(rc) => crate::document::set_child(rc, self, key, value.map(Value::Str)),
            Node::Group(rc) => crate::group::set_child(rc, key),
        }
    }

    pub fn clear_child(&self, key: &str) {
        match self {
            Node::Tree(rc) => crate::document::clear_child(rc, key),
            Node::Group(rc) => crate::group::clear_child(rc, key),
        }
    }

    /// Children's keys, in M collation order.
    pub fn child_keys(&self) -> Vec<String> {
        match self {
            Node::Tree(rc) => {
                crate::document::ensure_loaded(rc);
                rc.borrow().children.keys().map(|k| k.0.clone()).collect()
            }
            Node::Group(rc) => {
                crate::group::ensure_scanned(rc);
                rc.borrow().cache.keys().map(|k| k.0.clone()).collect()
            }
        }
    }

    /// The on-disk file this document reads from / writes to; `None` for
    /// anything that isn't a document (C4).
    pub fn path(&self) -> Option<PathBuf> {
        crate::document::path(self)
    }

    /// Flushes pending writes: a dirty document to its file, or a group's
    /// entire write queue (C4/C5 "save").
    pub fn save(&self) {
        match self {
            Node::Tree(_) => crate::document::save(self),
            Node::Group(rc) => crate::group::save(rc),
        }
    }

    /// Forgets this group's contents; a directory also deletes its entire
    /// subtree from disk. A no-op on anything but a group (C5 "clear").
    pub fn clear_all(&self) {
        if let Node::Group(rc) = self {
            crate::group::clear(rc);
        }
    }

    /// Notifies a group that `key` changed out from under it (e.g. a VCS
    /// checkout), so the next access re-reads it from disk (C5 "node
    /// changed").
    pub fn notify_child_changed(&self, key: &str) {
        if let Node::Group(rc) = self {
            crate::group::node_changed(rc, key);
        }
    }

    /// Forces a full directory rescan, preserving object identity of
    /// already-cached documents (C5 "reload").
    pub fn reload(&self) {
        if let Node::Group(rc) = self {
            crate::group::reload(rc);
        }
    }

    /// Renames one of this node's children. A no-op if the keys are equal.
    /// For a tree, this is an in-place dictionary-key swap that preserves
    /// the child's identity; for a group, it renames the backing file(s)
    /// on disk (§4.7 "move").
    pub fn move_child(&self, from_key: &str, to_key: &str) {
        match self {
            Node::Tree(rc) => {
                crate::document::ensure_loaded(rc);
                crate::document::move_child(rc, from_key, to_key);
            }
            Node::Group(rc) => crate::group::move_child(rc, from_key, to_key),
        }
    }

    /// Removes a document from persistent storage (C4 "delete").
    pub fn delete(&self) {
        crate::document::delete(self);
    }

    /// Whether this node (or, for a document, its file) has unsaved
    /// changes (§3 invariant 4).
    pub fn needs_write(&self) -> bool {
        match self {
            Node::Tree(rc) => rc.borrow().dirty,
            Node::Group(_) => false,
        }
    }

    /// Links an externally owned node in as a child without adopting it
    /// (C2 `link`, the "symlink" case) — the child's parent link is left
    /// untouched, unlike every other insertion path.
    pub fn link(&self, child: Node) {
        if let Node::Tree(rc) = self {
            crate::document::ensure_loaded(rc);
            let key = CollKey(child.key());
            rc.borrow_mut().children.insert(key, child);
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({:?})", self.key())
    }
}
