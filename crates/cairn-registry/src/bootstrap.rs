//! Seeding the registry from static configuration.
//!
//! Operator-configured peers enter the registry with `Static` provenance,
//! so later gossip about the same identities cannot demote them.

use cairn_core::config::CairnConfig;
use cairn_core::{NodeMetadata, NodeSource};

use crate::registry::NodeRegistry;

/// Register every valid `[[bootstrap.static_nodes]]` entry. Malformed keys
/// are skipped with a warning. Returns the number of nodes registered.
pub fn seed_from_config(registry: &NodeRegistry, config: &CairnConfig) -> usize {
    let mut modifier = registry.modifier();
    let mut seeded = 0;

    for entry in &config.bootstrap.static_nodes {
        let Some(key) = entry.parse_key() else {
            tracing::warn!(name = %entry.name, "skipping bootstrap node with malformed key");
            continue;
        };

        let roles = entry.parse_roles();
        modifier.add(NodeMetadata::new(key, entry.name.clone(), roles), NodeSource::Static);
        seeded += 1;
        tracing::info!(
            node = hex::encode(&key[..8]),
            name = %entry.name,
            "bootstrap node registered"
        );
    }

    seeded
}
