//! # Scoped subscription registry for bulk cancellation.
//!
//! [`SubscriptionRegistry`] collects [`SubscriptionHandle`]s and, when
//! disposed (explicitly or by going out of scope), unsubscribes every one of
//! them from the bus that issued them. Embed it as a field in any object that
//! owns subscriptions and they are severed automatically when the owner's
//! lifetime ends — no dangling-handler invocations after the owner is gone.
//!
//! ## Rules
//! - The registry holds only a **weak** reference to the bus: it never keeps
//!   the bus alive just to cancel subscriptions later. If the bus is already
//!   gone at disposal time, disposal is a silent no-op.
//! - Handles are inert data; the registry owns its list exclusively but owns
//!   nothing on the bus side.
//! - Disposal is idempotent: storage is cleared and the bus reference dropped
//!   on the first call.
//!
//! ## Example
//! ```rust
//! use stickybus::{EventBus, Payload, SubscriptionRegistry};
//!
//! let bus = EventBus::new();
//! let mut registry = SubscriptionRegistry::attached(&bus);
//!
//! registry.add(bus.subscribe("a", |_| println!("a fired")));
//! registry.add(bus.subscribe("b", |_| println!("b fired")));
//!
//! drop(registry); // both subscriptions are gone
//! bus.emit("a", Payload::default(), false); // nothing fires
//! ```

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::events::{EventBus, SubscriptionHandle};

/// Disposable container of subscription handles bound to one issuing bus.
///
/// ### Responsibilities
/// - **Collect**: [`add`](Self::add) appends handles as the owner subscribes.
/// - **Cancel**: [`dispose`](Self::dispose) (or `Drop`) unsubscribes every
///   stored handle against the bus, then clears storage.
///
/// ### Rules
/// - One registry tracks handles from one bus; attach before adding.
/// - A registry with no attached bus still accepts handles; they are simply
///   discarded at disposal.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handles: Vec<SubscriptionHandle>,
    bus: Weak<EventBus>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry with no bus attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry attached to `bus`.
    ///
    /// Holds only a weak reference: the registry never extends the bus's
    /// lifetime.
    pub fn attached(bus: &Arc<EventBus>) -> Self {
        Self {
            handles: Vec::new(),
            bus: Arc::downgrade(bus),
        }
    }

    /// Attaches (or re-attaches) the registry to `bus`.
    ///
    /// Handles already stored are disposed against the previously attached
    /// bus first, so a registry never mixes handles from two buses.
    pub fn attach(&mut self, bus: &Arc<EventBus>) {
        self.dispose();
        self.bus = Arc::downgrade(bus);
    }

    /// Stores a handle for cancellation at disposal time.
    pub fn add(&mut self, handle: SubscriptionHandle) {
        self.handles.push(handle);
    }

    /// Returns the number of handles currently held.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no handles are held.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Unsubscribes every stored handle, then clears storage and drops the
    /// bus reference.
    ///
    /// Silent no-op for handles that are already gone and when the bus itself
    /// has been dropped. Idempotent.
    pub fn dispose(&mut self) {
        if self.handles.is_empty() {
            self.bus = Weak::new();
            return;
        }
        let handles = std::mem::take(&mut self.handles);
        if let Some(bus) = self.bus.upgrade() {
            debug!(count = handles.len(), "disposing subscription registry");
            for handle in &handles {
                bus.unsubscribe(handle);
            }
        }
        self.bus = Weak::new();
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}
