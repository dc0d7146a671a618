//! cairn-core — shared node types and configuration.
//! The registry crate depends on this one.

pub mod config;
pub mod node;

pub use node::{NodeKey, NodeMetadata, NodeRoles, NodeSource, ServiceId};
