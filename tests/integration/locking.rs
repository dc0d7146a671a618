//! Locking-contract conformance suite.
//!
//! Generic over any [`LockedContainer`], so every stateful cache that
//! adopts the view/modifier discipline can be checked with the same
//! assertions. Run here against the raw `Locked<T>` wrapper and against
//! the node registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Barrier};
use std::thread;
use std::time::Duration;

use cairn_registry::{Locked, LockedContainer, NodeRegistry};

/// How long to wait before concluding an acquisition is (still) blocked.
const BLOCK_PROBE: Duration = Duration::from_millis(100);

/// A second modifier acquisition must block until the first releases.
fn assert_second_modifier_blocks<C: LockedContainer + Sync>(container: &C) {
    let acquired = AtomicBool::new(false);

    thread::scope(|s| {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (held_tx, held_rx) = mpsc::channel::<()>();

        s.spawn(move || {
            let _modifier = container.modifier();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        held_rx.recv().unwrap();

        let acquired_ref = &acquired;
        s.spawn(move || {
            let _modifier = container.modifier();
            acquired_ref.store(true, Ordering::SeqCst);
        });

        thread::sleep(BLOCK_PROBE);
        assert!(
            !acquired.load(Ordering::SeqCst),
            "second modifier acquired while the first was still held"
        );

        release_tx.send(()).unwrap();
    });

    assert!(
        acquired.load(Ordering::SeqCst),
        "second modifier never acquired after the first released"
    );
}

/// N views must be able to coexist. If views excluded each other this
/// would deadlock at the barrier and the test would hang.
fn assert_views_are_concurrent<C: LockedContainer + Sync>(container: &C, readers: usize) {
    let barrier = Barrier::new(readers);

    thread::scope(|s| {
        for _ in 0..readers {
            let barrier = &barrier;
            s.spawn(move || {
                let _view = container.view();
                barrier.wait();
            });
        }
    });
}

/// A modifier acquisition must wait for outstanding views, then proceed
/// once the last view releases.
fn assert_modifier_waits_for_views<C: LockedContainer + Sync>(container: &C) {
    let acquired = AtomicBool::new(false);

    thread::scope(|s| {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (held_tx, held_rx) = mpsc::channel::<()>();

        s.spawn(move || {
            let _view = container.view();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        held_rx.recv().unwrap();

        let acquired_ref = &acquired;
        s.spawn(move || {
            let _modifier = container.modifier();
            acquired_ref.store(true, Ordering::SeqCst);
        });

        thread::sleep(BLOCK_PROBE);
        assert!(
            !acquired.load(Ordering::SeqCst),
            "modifier acquired while a view was still held"
        );

        release_tx.send(()).unwrap();
    });

    assert!(
        acquired.load(Ordering::SeqCst),
        "modifier never acquired after the last view released"
    );
}

/// A view acquisition must wait for an outstanding modifier.
fn assert_view_waits_for_modifier<C: LockedContainer + Sync>(container: &C) {
    let acquired = AtomicBool::new(false);

    thread::scope(|s| {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (held_tx, held_rx) = mpsc::channel::<()>();

        s.spawn(move || {
            let _modifier = container.modifier();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        held_rx.recv().unwrap();

        let acquired_ref = &acquired;
        s.spawn(move || {
            let _view = container.view();
            acquired_ref.store(true, Ordering::SeqCst);
        });

        thread::sleep(BLOCK_PROBE);
        assert!(
            !acquired.load(Ordering::SeqCst),
            "view acquired while a modifier was still held"
        );

        release_tx.send(()).unwrap();
    });

    assert!(
        acquired.load(Ordering::SeqCst),
        "view never acquired after the modifier released"
    );
}

// ── Locked<T> ────────────────────────────────────────────────────────────────

#[test]
fn locked_second_modifier_blocks_until_first_releases() {
    assert_second_modifier_blocks(&Locked::new(0u32));
}

#[test]
fn locked_views_do_not_block_each_other() {
    assert_views_are_concurrent(&Locked::new(0u32), 8);
}

#[test]
fn locked_modifier_waits_for_outstanding_views() {
    assert_modifier_waits_for_views(&Locked::new(0u32));
}

#[test]
fn locked_view_waits_for_outstanding_modifier() {
    assert_view_waits_for_modifier(&Locked::new(0u32));
}

// ── NodeRegistry ─────────────────────────────────────────────────────────────

#[test]
fn registry_second_modifier_blocks_until_first_releases() {
    assert_second_modifier_blocks(&NodeRegistry::new());
}

#[test]
fn registry_views_do_not_block_each_other() {
    assert_views_are_concurrent(&NodeRegistry::new(), 8);
}

#[test]
fn registry_modifier_waits_for_outstanding_views() {
    assert_modifier_waits_for_views(&NodeRegistry::new());
}

#[test]
fn registry_view_waits_for_outstanding_modifier() {
    assert_view_waits_for_modifier(&NodeRegistry::new());
}
