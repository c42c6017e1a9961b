//! Caller notification slots
//!
//! Each callback kind lives in a single-slot holder that is overwritten whenever the
//! caller supplies a new function and read only when a completion is delivered, so a
//! late completion always reaches the most recently supplied function.

use super::types::DocumentHandle;

pub type DocumentLoadSuccess = dyn FnMut(&DocumentHandle);
pub type DocumentLoadFail = dyn FnMut();
pub type InvalidLocation = dyn FnMut();

/// Holder for the latest callback of one kind
pub struct CallbackSlot<F: ?Sized> {
    current: Option<Box<F>>,
}

impl<F: ?Sized> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<F: ?Sized> CallbackSlot<F> {
    /// Replace the callback, dropping the previous one
    pub fn set(&mut self, callback: Box<F>) {
        self.current = Some(callback);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    pub fn get_mut(&mut self) -> Option<&mut F> {
        self.current.as_deref_mut()
    }
}

impl<F: ?Sized> std::fmt::Debug for CallbackSlot<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_set() { "Set" } else { "Unset" })
    }
}

/// Latest caller-supplied callbacks
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    pub on_document_load_success: CallbackSlot<DocumentLoadSuccess>,
    pub on_document_load_fail: CallbackSlot<DocumentLoadFail>,
    pub on_invalid_location: CallbackSlot<InvalidLocation>,
}

impl CallbackRegistry {
    pub fn document_loaded(&mut self, document: &DocumentHandle) {
        if let Some(callback) = self.on_document_load_success.get_mut() {
            callback(document);
        }
    }

    pub fn document_failed(&mut self) {
        if let Some(callback) = self.on_document_load_fail.get_mut() {
            callback();
        }
    }

    pub fn invalid_location(&mut self) {
        if let Some(callback) = self.on_invalid_location.get_mut() {
            callback();
        }
    }
}
