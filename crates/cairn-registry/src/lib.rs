//! cairn-registry — the in-memory registry of known remote nodes.
//!
//! Tracks every peer this node has heard of: identity, provenance, role
//! capabilities, and per-service connection health. Read continuously by
//! networking and sync code through shared `view()` handles while discovery
//! and maintenance routines mutate it through an exclusive `modifier()`.
//!
//! Also home to two small primitives reused by every historical state store
//! in cairn: the [`pruning::PruningBoundary`] cut marker and the paired
//! full/non-historical serializers in [`history`].

pub mod bootstrap;
pub mod history;
pub mod locked;
pub mod pruning;
pub mod registry;

pub use locked::{Locked, LockedContainer, ModifierGuard, ViewGuard};
pub use pruning::PruningBoundary;
pub use registry::{
    find_all_active_nodes, ConnectionState, NodeInfo, NodeRegistry, RegistryError,
    RegistryModifier, RegistryView,
};
