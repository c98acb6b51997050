//! node/tracker — dirty flag сессии и «ворота» для атомарного снимка.
//!
//! Every mutation runs inside `mutate()` holding the gate shared; the saver
//! takes the gate exclusively in `snapshot_if_dirty()`, so "clear dirty +
//! serialize" is one step and no mutation is split across it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub(crate) struct Tracker {
    dirty: AtomicBool,
    gate: RwLock<()>,
}

impl Tracker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run a mutation and mark the owning session dirty.
    /// `f` must not call `mutate` again (the gate is not reentrant).
    pub(crate) fn mutate<R>(&self, f: impl FnOnce() -> R) -> R {
        let _g = self.gate.read().unwrap_or_else(|e| e.into_inner());
        let r = f();
        self.dirty.store(true, Ordering::Release);
        r
    }

    /// Like `mutate`, but the session is marked dirty only on Ok.
    pub(crate) fn try_mutate<R, E>(&self, f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        let _g = self.gate.read().unwrap_or_else(|e| e.into_inner());
        let r = f()?;
        self.dirty.store(true, Ordering::Release);
        Ok(r)
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// If dirty: clear the flag and run `f` with all mutators excluded.
    /// Returns None when there was nothing to save.
    pub(crate) fn snapshot_if_dirty<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let _g = self.gate.write().unwrap_or_else(|e| e.into_inner());
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(f())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_clears_dirty_once() {
        let t = Tracker::new();
        assert!(t.snapshot_if_dirty(|| ()).is_none());
        t.mutate(|| ());
        assert!(t.is_dirty());
        assert_eq!(t.snapshot_if_dirty(|| 7), Some(7));
        assert!(!t.is_dirty());
        assert!(t.snapshot_if_dirty(|| 7).is_none());
    }
}
