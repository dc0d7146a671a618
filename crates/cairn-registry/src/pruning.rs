//! Pruning boundary — how far back an ordered history may be discarded.

/// Optional cut marker over an ordered history.
///
/// Set: everything strictly before `value()` may be discarded. Unset:
/// nothing may be pruned. Works the same whether `T` is a plain value or a
/// shared handle (`Arc<_>`) — the boundary shares ownership of a handle's
/// target, it never takes it exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruningBoundary<T> {
    value: Option<T>,
}

impl<T> PruningBoundary<T> {
    /// A boundary that retains everything.
    pub const fn unset() -> Self {
        Self { value: None }
    }

    pub fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The cut value.
    ///
    /// # Panics
    ///
    /// Panics when the boundary is unset — check `is_set` first. An unset
    /// boundary has no meaningful cut to substitute.
    pub fn value(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => panic!("value() called on an unset pruning boundary"),
        }
    }
}

impl<T> Default for PruningBoundary<T> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<T> From<T> for PruningBoundary<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
