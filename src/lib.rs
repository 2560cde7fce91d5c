//! A hierarchical key-value document store with schema-2/3 text
//! serialization (§1).
//!
//! [`Node`] is the single entry point for every flavour of tree this crate
//! supports: in-memory volatile, dirty-tracking, disk-backed document, and
//! document group/directory. Construct one with [`Node::new_volatile`],
//! [`document::standalone`], [`group::free`], or [`group::directory`]; the
//! rest of the API (`get`/`set`/`child`, the merge/diff algebra, schema
//! serialization) doesn't care which you picked.
//!
//! ```
//! use n2a_store::Node;
//!
//! let root = Node::new_volatile("model");
//! root.set("42", &["dt"]);
//! assert_eq!(root.get_int(&["dt"]), 42);
//! ```

mod algebra;
mod collation;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod group;
mod node;
pub mod output;
pub mod schema;
mod value;

pub use diagnostics::{set_sink, set_strict, Diagnostics};
pub use error::{LookupError, ReadError};
pub use node::Node;
pub use output::{ColumnInfo, ColumnsSidecar, OutputHolder};
pub use value::{Gettable, Settable, Value};

#[cfg(feature = "figment_config")]
pub use config::StoreConfig;
#[cfg(feature = "init_env_logger")]
pub use config::init_logging;

#[cfg(test)]
mod integration {
    use super::*;

    #[test]
    fn builds_a_small_tree_and_reads_it_back() {
        let root = Node::new_volatile("model");
        root.set("42", &["dt"]);
        root.set("bar", &["population", "A", "name"]);
        assert_eq!(root.get_int(&["dt"]), 42);
        assert_eq!(root.get_path(&["population", "A", "name"]), "bar");
        assert_eq!(root.child_keys(), vec!["dt", "population"]);
    }
}
