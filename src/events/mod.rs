//! Event model and the thread-confined bus.
//!
//! This module groups the event **data model** and the **bus** that delivers
//! it: named subscriber sets, sticky payload slots, and the home-thread
//! confinement protocol.
//!
//! ## Contents
//! - [`Event`], [`SubscriptionHandle`], [`SubscriptionId`] — delivered events
//!   and removal tokens
//! - [`Payload`], [`Value`] — the dynamically typed payload map
//! - [`EventBus`], [`EventHandler`] — registration, emission, removal
//!
//! See `lib.rs` for the system-level wiring diagram.

mod bus;
mod event;
mod payload;

pub use bus::{EventBus, EventHandler};
pub use event::{Event, SubscriptionHandle, SubscriptionId};
pub use payload::{Payload, Value};
