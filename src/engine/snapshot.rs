//! Atomic snapshot swapping.
//!
//! Readers clone an `Arc` to the current value and keep using it for as
//! long as they like; writers build a complete replacement first and only
//! take the lock for the pointer swap. A reader never sees a half-built
//! value.

use std::sync::{Arc, PoisonError, RwLock};

/// Holder for the current immutable snapshot, if any.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    current: RwLock<Option<Arc<T>>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> SnapshotCell<T> {
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// The current snapshot.
    pub fn load(&self) -> Option<Arc<T>> {
        // The guarded value is a single pointer, so a poisoned lock is still consistent.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Replace the current snapshot, returning the one that was swapped in.
    pub fn store(&self, value: T) -> Arc<T> {
        let next = Arc::new(value);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&next));
        next
    }

    pub fn clear(&self) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_keeps_old_snapshot_after_swap() {
        let cell = SnapshotCell::empty();
        assert!(cell.is_empty());

        cell.store(vec![1, 2, 3]);
        let held = cell.load().unwrap();

        cell.store(vec![4]);
        assert_eq!(*held, vec![1, 2, 3]);
        assert_eq!(*cell.load().unwrap(), vec![4]);
    }

    #[test]
    fn test_clear() {
        let cell = SnapshotCell::empty();
        cell.store("a");
        cell.clear();
        assert!(cell.load().is_none());
    }
}
