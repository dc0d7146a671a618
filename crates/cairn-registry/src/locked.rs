//! Shared/exclusive access discipline for stateful containers.
//!
//! Every stateful cache in cairn exposes the same two accessors:
//! `view()` grants a read-only handle under a shared lock (any number may
//! coexist), `modifier()` grants a read-write handle under an exclusive
//! lock (at most one outstanding per container). Both are RAII guards —
//! the lock is released when the guard drops, on every exit path.
//!
//! Acquisition blocks indefinitely; there is no timeout or cancellation.
//! A thread must never request a view while holding a modifier on the same
//! container, or vice versa.

use std::ops::{Deref, DerefMut};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The view/modifier accessor contract.
///
/// Implemented by [`Locked`] directly and by wrapper containers (such as
/// the node registry) that expose richer handles over the same lock.
pub trait LockedContainer {
    type View<'a>
    where
        Self: 'a;
    type Modifier<'a>
    where
        Self: 'a;

    /// Acquire a shared read-only handle. Blocks while a modifier is held.
    fn view(&self) -> Self::View<'_>;

    /// Acquire the exclusive read-write handle. Blocks until all prior
    /// views and any prior modifier have released.
    fn modifier(&self) -> Self::Modifier<'_>;
}

/// A value guarded by the view/modifier discipline.
#[derive(Debug, Default)]
pub struct Locked<T> {
    inner: RwLock<T>,
}

impl<T> Locked<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    pub fn view(&self) -> ViewGuard<'_, T> {
        // A poisoned lock means some holder panicked. The guarded state is
        // only ever mutated through a modifier that runs to completion or
        // unwinds past map operations that keep the map itself sound, so
        // recover the guard instead of wedging every later caller.
        ViewGuard {
            guard: self.inner.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn modifier(&self) -> ModifierGuard<'_, T> {
        ModifierGuard {
            guard: self.inner.write().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Consume the container, returning the guarded value.
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> LockedContainer for Locked<T> {
    type View<'a>
        = ViewGuard<'a, T>
    where
        Self: 'a;
    type Modifier<'a>
        = ModifierGuard<'a, T>
    where
        Self: 'a;

    fn view(&self) -> ViewGuard<'_, T> {
        Locked::view(self)
    }

    fn modifier(&self) -> ModifierGuard<'_, T> {
        Locked::modifier(self)
    }
}

/// Read-only handle. Holds the shared lock until dropped.
#[derive(Debug)]
pub struct ViewGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
}

impl<T> Deref for ViewGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

/// Read-write handle. Holds the exclusive lock until dropped.
#[derive(Debug)]
pub struct ModifierGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
}

impl<T> Deref for ModifierGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ModifierGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
