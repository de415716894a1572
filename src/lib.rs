//! # stickybus
//!
//! **stickybus** is a thread-confined publish/subscribe event bus with
//! "sticky" last-value replay, a scoped subscription registry for bulk
//! cancellation, and a minimal reactive state container built on top.
//!
//! It is a building block for UI-style host loops: producers emit named
//! events, consumers subscribe with plain closures, and everything mutating
//! the bus is serialized onto the single thread the bus was created on.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  Producers (any thread):                 Consumers (any thread):
//!    emit / notify                           subscribe / subscribe_once
//!         │                                        │
//!         ▼                                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus (confined to its home thread)                           │
//! │  - per-name subscriber sets (insertion order)                     │
//! │  - sticky slot per name (latest payload, replayed to latecomers)  │
//! │  - deferred command queue (off-thread calls enqueue-and-return)   │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        │ dispatch (snapshot, synchronous,                 │
//!        │ home thread, no lock held)                       │
//!        ▼                                                  ▼
//!   handler, handler, handler, ...              SubscriptionHandle (inert)
//!                                                           │
//!                                                           ▼
//!                                              SubscriptionRegistry
//!                                              (owner-scoped cancel-all,
//!                                               weak back-ref to the bus)
//!
//!  StateContainer<T> ── set(v) ──► sticky emit "statechange"
//!                                  {previous: Option<T>, current: T}
//! ```
//!
//! ### Confinement
//! ```text
//! call on home thread:    drain deferred queue → execute inline → return
//! call on other thread:   push command → return immediately
//!                         (applied on the next home-thread call or pump())
//! ```
//!
//! ## Features
//! | Area             | Description                                             | Key types                                  |
//! |------------------|---------------------------------------------------------|--------------------------------------------|
//! | **Bus**          | Named pub/sub with sticky replay and one-shot handlers. | [`EventBus`], [`Event`], [`SubscriptionHandle`] |
//! | **Payloads**     | Dynamically typed map with checked downcast access.     | [`Payload`], [`Value`], [`PayloadError`]   |
//! | **Registries**   | Lifetime-bound bulk cancellation of subscriptions.      | [`SubscriptionRegistry`]                   |
//! | **State**        | Sticky `{previous, current}` broadcast on every change. | [`StateContainer`], [`StateTransition`]    |
//! | **Configuration**| Construction-time capacity hints.                       | [`BusConfig`]                              |
//!
//! ## Example
//! ```rust
//! use stickybus::{EventBus, Payload, SubscriptionRegistry};
//!
//! let bus = EventBus::new();
//!
//! // Sticky emission before anyone subscribes...
//! bus.emit("progress", Payload::new().with("percent", 40u8), true);
//!
//! // ...is replayed the moment a subscriber appears.
//! let mut registry = SubscriptionRegistry::attached(&bus);
//! registry.add(bus.subscribe("progress", |event| {
//!     let percent: u8 = event.payload.get_cloned("percent").unwrap();
//!     println!("progress: {percent}%");
//! }));
//!
//! bus.emit("progress", Payload::new().with("percent", 80u8), true);
//! registry.dispose(); // the subscriber is gone; the sticky slot remains
//! ```
//!
//! ## Delivery policy
//! Dispatch is synchronous and unisolated: a handler that panics propagates
//! to the emitter and aborts delivery to the remaining handlers of that
//! pass. Handlers are expected to be short, non-blocking, and
//! side-effect-light.

mod config;
mod error;
mod events;
mod registry;
mod state;

// ---- Public re-exports ----

pub use config::BusConfig;
pub use error::PayloadError;
pub use events::{Event, EventBus, EventHandler, Payload, SubscriptionHandle, SubscriptionId, Value};
pub use registry::SubscriptionRegistry;
pub use state::{StateContainer, StateTransition, CURRENT_KEY, PREVIOUS_KEY, STATE_CHANGE_EVENT};
