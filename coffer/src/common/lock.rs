//! Lock-guarded state shared between handles.
//!
//! Repository handles opened for a transaction share their tables and
//! registries with the handle that opened them through these helpers.
//! Closures run with the lock held, so they must not await or call back
//! into the same lock.

use parking_lot::RwLock;
use std::sync::Arc;

/// State shared between clones, guarded by a read-write lock.
pub type Atomic<T> = Arc<RwLock<T>>;

pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

pub trait ReadExecutor<T> {
    /// Runs `f` under the read lock.
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

pub trait WriteExecutor<T> {
    /// Runs `f` under the write lock.
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;

    /// Swaps the value for its default and returns the previous one.
    fn take_with(&self) -> T
    where
        T: Default,
    {
        self.write_with(std::mem::take)
    }
}

impl<T> ReadExecutor<T> for Atomic<T> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.read();
        f(&guard)
    }
}

impl<T> WriteExecutor<T> for Atomic<T> {
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.write();
        f(&mut guard)
    }
}
