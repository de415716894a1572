//! # Event data model: delivered events and subscription handles.
//!
//! An [`Event`] is the immutable `(name, payload)` pair handed to every
//! handler during a dispatch. A [`SubscriptionHandle`] is the opaque token
//! returned from registration, used only to request removal later.
//!
//! ## Equality
//! Two events compare equal when their **names** match; the payload is not
//! part of equality or hashing. This mirrors how sticky slots are addressed —
//! one slot per name — and exists for de-duplication only.
//!
//! Handles compare equal by subscription **id** only. Ids are UUIDv4, drawn
//! from a process-global space, so a handle can never collide with one issued
//! by a different bus instance.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

use super::payload::Payload;

/// Globally unique identity of one registered subscription.
///
/// Assigned when registration is *requested*, so a handle returned from an
/// off-thread call already carries its final id even though registration
/// applies later on the bus's home thread.
pub type SubscriptionId = Uuid;

/// An event delivered to a handler: a name plus its dynamically typed payload.
#[derive(Clone, Debug)]
pub struct Event {
    /// The event name the emission was addressed to.
    pub name: Arc<str>,
    /// Data attached to this emission (possibly empty).
    pub payload: Payload,
}

impl Event {
    /// Creates an event for `name` carrying `payload`.
    pub(crate) fn new(name: Arc<str>, payload: Payload) -> Self {
        Self { name, payload }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Opaque capability token for removing one subscription.
///
/// Inert data: freely clonable and shareable, carries no ownership of the
/// registered handler. Valid for removal only against the bus that issued it;
/// using it against any other bus is a silent no-op.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    pub(crate) event_name: Arc<str>,
    pub(crate) id: SubscriptionId,
}

impl SubscriptionHandle {
    /// The event name this handle's subscription was registered under.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The globally unique id of the subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl PartialEq for SubscriptionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriptionHandle {}

impl Hash for SubscriptionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
