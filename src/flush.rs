//! Gate between the object graph and the serializer.
//!
//! An object may only be written once it has passed its checks. Objects
//! created through the checked authoring calls are marked as checked when
//! they are added; raw objects are not, and stay in memory until they are
//! flushed together with their dependents or checked at close. Once an
//! object has been flushed it is immutable.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::store::ObjectStore;
use std::collections::HashSet;

/// Tracks which objects are checked, pinned, and already written.
#[derive(Debug, Default, Clone)]
pub struct ObjectFlushGuard {
    checked: HashSet<ObjectRef>,
    flushed: HashSet<ObjectRef>,
    /// Objects the document still edits until close (catalog, page tree, pages)
    pinned: HashSet<ObjectRef>,
}

impl ObjectFlushGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an object passed its checks.
    pub fn mark_checked(&mut self, reference: ObjectRef) {
        self.checked.insert(reference);
    }

    /// Forget a check, e.g. after the object was modified.
    pub fn invalidate(&mut self, reference: ObjectRef) {
        self.checked.remove(&reference);
    }

    /// Keep an object in memory until close.
    pub fn pin(&mut self, reference: ObjectRef) {
        self.pinned.insert(reference);
    }

    /// Whether an object passed its checks.
    pub fn is_checked(&self, reference: ObjectRef) -> bool {
        self.checked.contains(&reference)
    }

    /// Whether an object has been written.
    pub fn is_flushed(&self, reference: ObjectRef) -> bool {
        self.flushed.contains(&reference)
    }

    /// Fails if the object was already written.
    pub fn ensure_mutable(&self, reference: ObjectRef) -> Result<()> {
        if self.is_flushed(reference) {
            return Err(Error::ObjectAlreadyFlushed(reference));
        }
        Ok(())
    }

    /// Flush one object if it is checked and neither pinned nor flushed.
    ///
    /// Returns false without doing anything otherwise. The caller writes
    /// the object when this returns true.
    pub fn try_flush(&mut self, reference: ObjectRef) -> bool {
        if !self.is_checked(reference) || self.pinned.contains(&reference) || self.is_flushed(reference) {
            log::debug!("Refusing to flush {}", reference);
            return false;
        }
        self.flushed.insert(reference);
        true
    }

    /// Check an object and every unflushed object reachable from it, then
    /// flush them all.
    ///
    /// `check` runs on each object not yet checked; the first failure is
    /// returned and nothing is flushed. Pinned objects are neither checked
    /// nor flushed and their references are not followed. Returns the
    /// flushed references in discovery order.
    pub fn flush_with_dependents<F>(
        &mut self,
        root: ObjectRef,
        store: &ObjectStore,
        mut check: F,
    ) -> Result<Vec<ObjectRef>>
    where
        F: FnMut(&Object) -> Result<()>,
    {
        let mut pending = vec![root];
        let mut seen = HashSet::new();
        let mut order = Vec::new();

        while let Some(reference) = pending.pop() {
            if !seen.insert(reference) || self.is_flushed(reference) || self.pinned.contains(&reference) {
                continue;
            }
            let object = store.fetch(reference)?;
            if !self.is_checked(reference) {
                check(object)?;
            }
            order.push(reference);
            pending.extend(object.references().into_iter().rev());
        }

        for reference in &order {
            self.checked.insert(*reference);
            self.flushed.insert(*reference);
        }
        log::debug!("Flushed {} with {} dependents", root, order.len().saturating_sub(1));
        Ok(order)
    }
}
