//! # Demo: statechange
//!
//! A screen-like owner watches a [`StateContainer`] through a
//! [`SubscriptionRegistry`], so its subscriptions end with it.
//!
//! Demonstrates how to:
//! - Construct a container and receive the sticky initial state immediately.
//! - Drive typed transitions with [`StateContainer::set`].
//! - Push a change from a worker thread (deferred onto the home thread,
//!   applied by [`EventBus::pump`]).
//! - Sever all of an owner's subscriptions by dropping its registry.
//!
//! ## Flow
//! ```text
//! StateContainer::new(Idle) ──► sticky emit {previous: Idle, current: Idle}
//! Screen::new(&container)   ──► on_change fires at once (sticky replay)
//! container.set(Loading)    ──► {Idle, Loading}
//! worker thread: bus.emit() ──► queued
//! container.bus().pump()    ──► queued emit delivered
//! drop(screen)              ──► registry disposes, no further delivery
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example statechange
//! ```

use std::thread;

use stickybus::{Payload, StateContainer, StateTransition, SubscriptionRegistry};

#[derive(Clone, Debug, PartialEq)]
enum Phase {
    Idle,
    Loading,
    Ready,
}

/// Owner of subscriptions: everything it registers dies with it.
struct Screen {
    // Held for its Drop: disposal unsubscribes everything the screen added.
    _registry: SubscriptionRegistry,
}

impl Screen {
    fn new(phases: &StateContainer<Phase>) -> Self {
        let mut registry = SubscriptionRegistry::attached(phases.bus());
        registry.add(phases.on_change(|t: StateTransition<Phase>| {
            println!("[screen] {:?} -> {:?}", t.previous, t.current);
        }));
        registry.add(phases.bus().subscribe("toast", |event| {
            let text: String = event.payload.get_cloned("text").unwrap_or_default();
            println!("[screen] toast: {text}");
        }));
        Self {
            _registry: registry,
        }
    }
}

fn main() {
    let mut phases = StateContainer::new(Phase::Idle);

    // Sticky replay fires the moment the screen subscribes.
    let screen = Screen::new(&phases);

    phases.set(Phase::Loading);
    phases.set(Phase::Ready);

    // Off-thread emissions never run in place; they are queued...
    thread::scope(|s| {
        s.spawn(|| {
            phases.bus().emit(
                "toast",
                Payload::new().with("text", String::from("saved from worker")),
                false,
            );
        })
        .join()
        .expect("worker thread panicked");
    });

    // ...and applied once the home thread pumps the queue.
    phases.bus().pump();

    // Dropping the screen severs both subscriptions.
    drop(screen);
    phases.set(Phase::Idle); // nothing prints

    println!("final phase: {:?}", phases.current());
}
