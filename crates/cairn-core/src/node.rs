//! Node identity, provenance, and capability types.
//!
//! A node is a remote peer identified by its public key. Everything the
//! registry knows about it hangs off these types: where the record came
//! from (`NodeSource`), what the peer claims to be able to do (`NodeRoles`),
//! and the human-facing metadata that travels with the record.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Ed25519 public key — the unique identity of a remote node.
/// Equality is byte-exact.
pub type NodeKey = [u8; 32];

/// How a node record was learned.
///
/// The variant order is the trust ranking: a record can replace an existing
/// one only when its source ranks at least as high as the stored one.
/// `Dynamic` is gossip/discovery, `Static` is operator configuration,
/// `Local` is this process's own identity data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSource {
    Dynamic,
    Static,
    Local,
}

/// Capability bitmask a node advertises.
///
/// `NONE` is the zero mask. In service-requirement checks it acts as a
/// wildcard: a requirement of `NONE` matches every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRoles(u32);

impl NodeRoles {
    pub const NONE: NodeRoles = NodeRoles(0);
    /// Participates in peer-to-peer sync.
    pub const PEER: NodeRoles = NodeRoles(1);
    /// Serves the query API.
    pub const API: NodeRoles = NodeRoles(1 << 1);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> NodeRoles {
        NodeRoles(bits)
    }

    pub const fn intersects(self, other: NodeRoles) -> bool {
        self.0 & other.0 != 0
    }

    /// Service-requirement match rule: a `NONE` requirement matches any
    /// node, otherwise the masks must share at least one bit.
    pub const fn satisfies(self, required: NodeRoles) -> bool {
        required.0 == 0 || self.0 & required.0 != 0
    }

    /// Parse a single role name as it appears in config files.
    pub fn from_name(name: &str) -> Option<NodeRoles> {
        match name {
            "peer" => Some(NodeRoles::PEER),
            "api" => Some(NodeRoles::API),
            _ => None,
        }
    }
}

impl BitOr for NodeRoles {
    type Output = NodeRoles;

    fn bitor(self, rhs: NodeRoles) -> NodeRoles {
        NodeRoles(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeRoles {
    fn bitor_assign(&mut self, rhs: NodeRoles) {
        self.0 |= rhs.0;
    }
}

/// Numeric identifier of a network service that tracks per-node
/// connection health (e.g. one sync protocol instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub u32);

/// Everything a node announces about itself.
///
/// Replaced atomically as a whole by the registry's promotion policy —
/// never field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub key: NodeKey,
    pub name: String,
    pub roles: NodeRoles,
}

impl NodeMetadata {
    pub fn new(key: NodeKey, name: impl Into<String>, roles: NodeRoles) -> Self {
        Self {
            key,
            name: name.into(),
            roles,
        }
    }
}
