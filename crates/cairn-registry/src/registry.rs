//! Node registry — identity, provenance, roles, and per-service connection
//! health for every remote node this process knows about.
//!
//! Promotion policy: a record may only be replaced by one whose source ranks
//! at least as high. Higher rank replaces the metadata wholesale; equal rank
//! refreshes it (newest data wins); lower rank is rejected. Connection
//! states survive every replacement.
//!
//! Connection states exist only where explicitly provisioned — either
//! directly, or automatically because a registered service requirement
//! matches the node's current role mask. Absence of a state means "no state
//! requested", never "implicitly zero".

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use cairn_core::{NodeKey, NodeMetadata, NodeRoles, NodeSource, ServiceId};

use crate::locked::{Locked, LockedContainer, ModifierGuard, ViewGuard};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("node {} is not in the registry", hex::encode(.0))]
    UnknownNode(NodeKey),
}

/// Per-(service, node) activity counter.
///
/// Age 0 = known but currently inactive; age N = N consecutive successful
/// rounds for that service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub age: u32,
}

/// The registry's live record for one node: current provenance plus the
/// connection state of every service that tracks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    source: NodeSource,
    connections: HashMap<ServiceId, ConnectionState>,
}

impl NodeInfo {
    fn new(source: NodeSource) -> Self {
        Self {
            source,
            connections: HashMap::new(),
        }
    }

    pub fn source(&self) -> NodeSource {
        self.source
    }

    pub fn num_connection_states(&self) -> usize {
        self.connections.len()
    }

    /// The state for `service`, if one was ever provisioned.
    pub fn connection_state(&self, service: ServiceId) -> Option<&ConnectionState> {
        self.connections.get(&service)
    }

    /// True when at least one service sees this node as active.
    pub fn has_active_connection(&self) -> bool {
        self.connections.values().any(|state| state.age > 0)
    }

    fn provision(&mut self, service: ServiceId) -> &mut ConnectionState {
        self.connections.entry(service).or_default()
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    metadata: NodeMetadata,
    info: NodeInfo,
}

#[derive(Debug, Default)]
struct RegistryData {
    nodes: HashMap<NodeKey, NodeEntry>,
    /// Required-role mask per service, recorded by `add_connection_states`.
    service_roles: HashMap<ServiceId, NodeRoles>,
}

impl RegistryData {
    fn node_info(&self, key: &NodeKey) -> Result<&NodeInfo, RegistryError> {
        self.nodes
            .get(key)
            .map(|entry| &entry.info)
            .ok_or(RegistryError::UnknownNode(*key))
    }
}

/// The registry of known remote nodes — shared between discovery,
/// maintenance, and peer-selection tasks.
///
/// All access goes through [`view`](NodeRegistry::view) (shared, read-only)
/// or [`modifier`](NodeRegistry::modifier) (exclusive, read-write); see the
/// [`locked`](crate::locked) module for the locking contract.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    data: Locked<RegistryData>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a read-only view. Blocks while a modifier is outstanding.
    pub fn view(&self) -> RegistryView<'_> {
        RegistryView {
            guard: self.data.view(),
        }
    }

    /// Acquire the exclusive modifier. Blocks until all prior views and any
    /// prior modifier have released.
    pub fn modifier(&self) -> RegistryModifier<'_> {
        RegistryModifier {
            guard: self.data.modifier(),
        }
    }
}

impl LockedContainer for NodeRegistry {
    type View<'a>
        = RegistryView<'a>
    where
        Self: 'a;
    type Modifier<'a>
        = RegistryModifier<'a>
    where
        Self: 'a;

    fn view(&self) -> RegistryView<'_> {
        NodeRegistry::view(self)
    }

    fn modifier(&self) -> RegistryModifier<'_> {
        NodeRegistry::modifier(self)
    }
}

/// Read-only view over the registry. References returned by accessors are
/// valid only for the lifetime of the view.
pub struct RegistryView<'a> {
    guard: ViewGuard<'a, RegistryData>,
}

impl RegistryView<'_> {
    pub fn len(&self) -> usize {
        self.guard.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.nodes.is_empty()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.guard.nodes.contains_key(key)
    }

    /// Iterate over `(identity, metadata)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &NodeMetadata)> {
        self.guard
            .nodes
            .iter()
            .map(|(key, entry)| (key, &entry.metadata))
    }

    /// The live record for `key`. Unknown identities fail fast.
    pub fn node_info(&self, key: &NodeKey) -> Result<&NodeInfo, RegistryError> {
        self.guard.node_info(key)
    }
}

/// Exclusive read-write handle over the registry.
pub struct RegistryModifier<'a> {
    guard: ModifierGuard<'a, RegistryData>,
}

impl RegistryModifier<'_> {
    /// Insert or update a node record according to the promotion policy.
    ///
    /// Unknown identity: inserted as-is. Known identity: the stored record
    /// is replaced wholesale when `source` ranks higher (promotion) or
    /// equal (refresh); a lower rank leaves it untouched. Connection states
    /// are preserved in every case, and after any insert or replacement the
    /// node is provisioned for every recorded service requirement its
    /// current roles match.
    pub fn add(&mut self, metadata: NodeMetadata, source: NodeSource) {
        let RegistryData {
            nodes,
            service_roles,
        } = &mut *self.guard;

        let key = metadata.key;
        match nodes.entry(key) {
            Entry::Vacant(slot) => {
                tracing::debug!(node = short_key(&key), ?source, name = %metadata.name, "node added");
                let entry = slot.insert(NodeEntry {
                    metadata,
                    info: NodeInfo::new(source),
                });
                auto_provision(service_roles, entry);
            }
            Entry::Occupied(slot) => {
                let entry = slot.into_mut();
                if source < entry.info.source {
                    tracing::trace!(
                        node = short_key(&key),
                        stored = ?entry.info.source,
                        offered = ?source,
                        "demotion rejected"
                    );
                    return;
                }
                if source > entry.info.source {
                    tracing::debug!(
                        node = short_key(&key),
                        from = ?entry.info.source,
                        to = ?source,
                        "node promoted"
                    );
                }
                entry.metadata = metadata;
                entry.info.source = source;
                auto_provision(service_roles, entry);
            }
        }
    }

    /// Record the required-role mask for `service` (overwriting any earlier
    /// requirement) and provision an Age-0 state for every registered node
    /// whose roles match. Future `add` calls apply the requirement too, so
    /// the end state does not depend on call order.
    pub fn add_connection_states(&mut self, service: ServiceId, required: NodeRoles) {
        let RegistryData {
            nodes,
            service_roles,
        } = &mut *self.guard;

        service_roles.insert(service, required);
        for entry in nodes.values_mut() {
            if entry.metadata.roles.satisfies(required) {
                entry.info.provision(service);
            }
        }
    }

    /// The connection state for `(service, key)`, creating it at age 0 on
    /// first use. Unknown identities fail fast — callers must `add` first.
    pub fn provision_connection_state(
        &mut self,
        service: ServiceId,
        key: &NodeKey,
    ) -> Result<&mut ConnectionState, RegistryError> {
        let entry = self
            .guard
            .nodes
            .get_mut(key)
            .ok_or(RegistryError::UnknownNode(*key))?;
        Ok(entry.info.provision(service))
    }

    /// Apply one activity round for `service`: every registered node in
    /// `active` has its state provisioned (if missing) and aged by one;
    /// every node holding a state for `service` but absent from `active`
    /// has its age reset to 0. Everything else — including active keys that
    /// are not registered — is untouched.
    pub fn age_connections(&mut self, service: ServiceId, active: &HashSet<NodeKey>) {
        for (key, entry) in &mut self.guard.nodes {
            if active.contains(key) {
                entry.info.provision(service).age += 1;
            } else if let Some(state) = entry.info.connections.get_mut(&service) {
                state.age = 0;
            }
        }
    }
}

/// Identities with at least one connection state at age > 0, across any
/// service. The peer-selection working set.
pub fn find_all_active_nodes(view: &RegistryView<'_>) -> HashSet<NodeKey> {
    view.guard
        .nodes
        .iter()
        .filter(|(_, entry)| entry.info.has_active_connection())
        .map(|(key, _)| *key)
        .collect()
}

fn auto_provision(service_roles: &HashMap<ServiceId, NodeRoles>, entry: &mut NodeEntry) {
    for (&service, &required) in service_roles {
        if entry.metadata.roles.satisfies(required) {
            entry.info.provision(service);
        }
    }
}

fn short_key(key: &NodeKey) -> String {
    hex::encode(&key[..8])
}
