//! Diagnostic sink for operational (disk) failures that the store catches
//! rather than propagates (§7 "Propagation policy").
//!
//! Mirrors the spirit of the teacher's `DmlWithReport` — a pluggable
//! reporting channel supplied by the caller — without requiring an actual
//! channel, since this store runs single-threaded and synchronously (§5).

use std::cell::RefCell;

/// Receives non-fatal warnings about failed disk operations.
pub trait Diagnostics {
    fn warn(&self, message: &str);
}

/// Default sink: forwards to the `log` facade at `warn` level.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

thread_local! {
    static SINK: RefCell<Box<dyn Diagnostics>> = RefCell::new(Box::new(LogDiagnostics));
    static STRICT: RefCell<bool> = RefCell::new(false);
}

/// Installs a new diagnostics sink for the current thread, e.g. to capture
/// warnings in a test or route them through an application's own logger.
pub fn set_sink(sink: Box<dyn Diagnostics>) {
    SINK.with(|s| *s.borrow_mut() = sink);
}

/// Sets whether [`report`] panics instead of merely warning, per
/// `StoreConfig::strict_parsing`.
pub fn set_strict(strict: bool) {
    STRICT.with(|s| *s.borrow_mut() = strict);
}

pub(crate) fn report(message: impl AsRef<str>) {
    let message = message.as_ref();
    if STRICT.with(|s| *s.borrow()) {
        panic!("{message}");
    }
    SINK.with(|s| s.borrow().warn(message));
}

#[cfg(test)]
pub(crate) struct RecordingDiagnostics {
    pub messages: RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingDiagnostics {
    pub fn new() -> std::rc::Rc<Self> {
        std::rc::Rc::new(Self {
            messages: RefCell::new(Vec::new()),
        })
    }
}

#[cfg(test)]
impl Diagnostics for std::rc::Rc<RecordingDiagnostics> {
    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
