//! Error kinds raised by the schema codec, and the diagnostic-sink
//! machinery used for operational (disk) failures (§7).

use thiserror::Error;

/// Errors that propagate out of [`crate::schema::read_all`] (§4.6, §7).
///
/// All other I/O failures encountered while reading a body are swallowed:
/// parsing simply stops at the failure point, preserving whatever has
/// already been read.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ReadError {
    #[error("file is empty")]
    EmptyFile,
    #[error("missing or malformed N2A.schema= header line")]
    BadHeader,
}

/// Error for the indexing-operator-equivalent lookup (§7 `KeyNotFound`).
///
/// The dotted `get`/`child` family never fails this way — they return a
/// default or an absent node. This is only for call sites that want
/// "key must exist" semantics.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LookupError {
    #[error("no child with key {0:?}")]
    KeyNotFound(String),
}
