//! Registry behavior across threads and across crates.

use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;

use cairn_core::config::{CairnConfig, StaticNodeEntry};
use cairn_core::{NodeRoles, NodeSource, ServiceId};
use cairn_registry::{bootstrap, find_all_active_nodes, NodeRegistry};

use crate::{key, named_node};

/// A view acquired after a modifier releases sees every one of its effects,
/// never a partial write.
#[test]
fn views_observe_modifier_effects_in_full() {
    let registry = NodeRegistry::new();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        let registry = &registry;
        s.spawn(move || {
            let mut modifier = registry.modifier();
            modifier.add_connection_states(ServiceId(1), NodeRoles::PEER);
            for i in 1..=10 {
                modifier.add(named_node(i, "peer", NodeRoles::PEER), NodeSource::Dynamic);
            }
            drop(modifier);
            done_tx.send(()).unwrap();
        });

        done_rx.recv().unwrap();
        let view = registry.view();
        assert_eq!(view.len(), 10);
        for i in 1..=10 {
            let info = view.node_info(&key(i)).unwrap();
            assert_eq!(info.num_connection_states(), 1);
        }
    });
}

/// Readers snapshotting while a writer churns always see a consistent
/// count: every observed size corresponds to a whole number of completed
/// add batches.
#[test]
fn concurrent_readers_see_whole_batches_only() {
    const BATCH: usize = 5;
    const BATCHES: u8 = 20;

    let registry = NodeRegistry::new();

    thread::scope(|s| {
        let registry = &registry;

        s.spawn(move || {
            for batch in 0..BATCHES {
                let mut modifier = registry.modifier();
                for slot in 0..BATCH as u8 {
                    let fill = batch * BATCH as u8 + slot + 1;
                    modifier.add(named_node(fill, "n", NodeRoles::PEER), NodeSource::Dynamic);
                }
            }
        });

        for _ in 0..4 {
            s.spawn(move || {
                for _ in 0..50 {
                    let view = registry.view();
                    let len = view.len();
                    assert_eq!(len % BATCH, 0, "observed a torn batch: {len} nodes");
                }
            });
        }
    });

    assert_eq!(registry.view().len(), BATCH * BATCHES as usize);
}

/// Discovery, maintenance, and peer selection working the same registry:
/// seed from config, watch a service, age a few rounds, pick the actives.
#[test]
fn full_lifecycle_from_config_to_active_set() {
    let mut config = CairnConfig::default();
    config.bootstrap.static_nodes = vec![
        StaticNodeEntry {
            public_key: "01".repeat(32),
            name: "anchor-1".to_string(),
            roles: vec!["peer".to_string()],
        },
        StaticNodeEntry {
            public_key: "02".repeat(32),
            name: "anchor-2".to_string(),
            roles: vec!["peer".to_string(), "api".to_string()],
        },
    ];

    let registry = NodeRegistry::new();
    assert_eq!(bootstrap::seed_from_config(&registry, &config), 2);

    // a sync service starts watching peers
    registry
        .modifier()
        .add_connection_states(ServiceId(7), NodeRoles::PEER);

    // discovery later hears about one of the anchors over gossip; the
    // Static record must win
    registry
        .modifier()
        .add(named_node(1, "gossip-name", NodeRoles::PEER), NodeSource::Dynamic);
    assert_eq!(
        registry.view().node_info(&key(1)).unwrap().source(),
        NodeSource::Static
    );

    // two successful rounds for anchor-1, then it goes quiet
    let sync = ServiceId(7);
    registry.modifier().age_connections(sync, &HashSet::from([key(1)]));
    registry.modifier().age_connections(sync, &HashSet::from([key(1)]));
    assert_eq!(
        find_all_active_nodes(&registry.view()),
        HashSet::from([key(1)])
    );

    registry.modifier().age_connections(sync, &HashSet::from([key(2)]));
    let view = registry.view();
    assert_eq!(view.node_info(&key(1)).unwrap().connection_state(sync).unwrap().age, 0);
    assert_eq!(view.node_info(&key(2)).unwrap().connection_state(sync).unwrap().age, 1);
    drop(view);

    assert_eq!(
        find_all_active_nodes(&registry.view()),
        HashSet::from([key(2)])
    );
}

/// The scripted scenario from the design review: a requirement recorded
/// before a non-matching add is applied once a promotion changes the roles.
#[test]
fn promotion_applies_requirements_recorded_before_the_node_existed() {
    let registry = NodeRegistry::new();
    registry
        .modifier()
        .add_connection_states(ServiceId(123), NodeRoles::API);

    registry
        .modifier()
        .add(named_node(9, "bob", NodeRoles::PEER), NodeSource::Dynamic);
    assert!(registry
        .view()
        .node_info(&key(9))
        .unwrap()
        .connection_state(ServiceId(123))
        .is_none());

    registry
        .modifier()
        .add(named_node(9, "bob", NodeRoles::API), NodeSource::Static);
    let view = registry.view();
    let info = view.node_info(&key(9)).unwrap();
    assert_eq!(info.source(), NodeSource::Static);
    assert_eq!(info.connection_state(ServiceId(123)).unwrap().age, 0);
}
