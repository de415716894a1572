//! # Reactive state container: a value holder that broadcasts transitions.
//!
//! [`StateContainer`] wraps one [`EventBus`] and holds a single current value
//! of an application-defined type `T`. Every replacement of the value — and
//! construction itself — performs one **sticky** emission of the
//! [`STATE_CHANGE_EVENT`] carrying `{previous, current}`, so a late
//! subscriber immediately learns the current state the moment it subscribes.
//!
//! ## Event contract
//! ```text
//! name:    "statechange"            (sticky)
//! payload: "previous" → Option<T>   (Some from construction on)
//!          "current"  → T
//! ```
//!
//! ## Rules
//! - No validation, no transition table: `T` may take any value in any
//!   order. Domain discipline belongs to the owning application.
//! - Mutation happens only through [`StateContainer::set`], by the owner.
//! - Typed consumption goes through [`StateTransition::from_event`] or the
//!   [`StateContainer::on_change`] helpers — decode failures are explicit
//!   ([`PayloadError`]), never a silent default.
//!
//! ## Example
//! ```rust
//! use stickybus::StateContainer;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Phase { Idle, Loading, Ready }
//!
//! let mut phase = StateContainer::new(Phase::Idle);
//! phase.on_change(|t| println!("{:?} -> {:?}", t.previous, t.current));
//!
//! phase.set(Phase::Loading);
//! phase.set(Phase::Ready);
//! assert_eq!(*phase.current(), Phase::Ready);
//! ```

use std::sync::Arc;

use tracing::error;

use crate::error::PayloadError;
use crate::events::{Event, EventBus, Payload, SubscriptionHandle};

/// Name of the sticky event emitted on every state replacement.
pub const STATE_CHANGE_EVENT: &str = "statechange";

/// Payload key holding the prior value (`Option<T>`).
pub const PREVIOUS_KEY: &str = "previous";

/// Payload key holding the new value (`T`).
pub const CURRENT_KEY: &str = "current";

/// One decoded state transition: the value being replaced and its
/// replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTransition<T> {
    /// Value held before this transition. `Some` from construction on.
    pub previous: Option<T>,
    /// Value held after this transition.
    pub current: T,
}

impl<T: Clone + Send + Sync + 'static> StateTransition<T> {
    /// Decodes a transition from a [`STATE_CHANGE_EVENT`] payload.
    ///
    /// Fails with [`PayloadError`] when a key is missing or carries a value
    /// of the wrong type — e.g. when the event came from a container of a
    /// different `T`.
    pub fn from_event(event: &Event) -> Result<Self, PayloadError> {
        let previous = event.payload.get_cloned::<Option<T>>(PREVIOUS_KEY)?;
        let current = event.payload.get_cloned::<T>(CURRENT_KEY)?;
        Ok(Self { previous, current })
    }
}

/// Holds one value of `T` and sticky-broadcasts every replacement.
///
/// ### Responsibilities
/// - **Hold**: [`current`](Self::current) / [`previous`](Self::previous)
///   expose the live values.
/// - **Broadcast**: construction and every [`set`](Self::set) emit one sticky
///   [`STATE_CHANGE_EVENT`] on the wrapped bus.
/// - **Expose**: [`bus`](Self::bus) hands out the bus for raw subscriptions
///   and [`SubscriptionRegistry`](crate::SubscriptionRegistry) attachment.
///
/// The wrapped bus is created by the container and confined to the
/// constructing thread; `set` from another thread defers its emission like
/// any other off-thread bus call.
pub struct StateContainer<T> {
    bus: Arc<EventBus>,
    previous: Option<T>,
    current: T,
}

impl<T: Clone + Send + Sync + 'static> StateContainer<T> {
    /// Creates a container holding `initial` and performs the first sticky
    /// emission, so sticky data exists from the moment the container does.
    ///
    /// Both `previous` and `current` start as `initial`.
    pub fn new(initial: T) -> Self {
        let container = Self {
            bus: EventBus::new(),
            previous: Some(initial.clone()),
            current: initial,
        };
        container.emit_transition();
        container
    }

    /// The value currently held.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The value held immediately before the last transition.
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// The wrapped event bus.
    ///
    /// Use it for raw subscriptions to [`STATE_CHANGE_EVENT`] or to attach a
    /// [`SubscriptionRegistry`](crate::SubscriptionRegistry).
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Replaces the held value and sticky-broadcasts the transition.
    ///
    /// Captures the prior current value as `previous`, stores `value` as
    /// `current`, then emits `{previous, current}` under
    /// [`STATE_CHANGE_EVENT`].
    pub fn set(&mut self, value: T) {
        self.previous = Some(std::mem::replace(&mut self.current, value));
        self.emit_transition();
    }

    /// Subscribes a typed transition handler.
    ///
    /// Because the event is sticky, the handler fires immediately with the
    /// current state. Events whose payload does not decode as a
    /// `StateTransition<T>` are skipped with an error log — they indicate a
    /// producer/consumer type mismatch, not a condition the handler should
    /// guess its way through.
    pub fn on_change(
        &self,
        handler: impl Fn(StateTransition<T>) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.bus
            .subscribe(STATE_CHANGE_EVENT, Self::decoding(handler))
    }

    /// Subscribes a typed transition handler that fires at most once.
    ///
    /// The immediate sticky replay counts as the one firing.
    pub fn on_change_once(
        &self,
        handler: impl Fn(StateTransition<T>) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.bus
            .subscribe_once(STATE_CHANGE_EVENT, Self::decoding(handler))
    }

    fn decoding(
        handler: impl Fn(StateTransition<T>) + Send + Sync + 'static,
    ) -> impl Fn(&Event) + Send + Sync + 'static {
        move |event| match StateTransition::<T>::from_event(event) {
            Ok(transition) => handler(transition),
            Err(err) => {
                error!(label = err.as_label(), %err, "statechange payload failed to decode");
            }
        }
    }

    fn emit_transition(&self) {
        let payload = Payload::new()
            .with(PREVIOUS_KEY, self.previous.clone())
            .with(CURRENT_KEY, self.current.clone());
        self.bus.emit(STATE_CHANGE_EVENT, payload, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_late_subscriber_receives_initial_state() {
        let container = StateContainer::new(10u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        container.on_change(move |t| sink.lock().push((t.previous, t.current)));
        assert_eq!(*seen.lock(), vec![(Some(10), 10)]);
    }

    #[test]
    fn test_set_broadcasts_previous_and_current() {
        let mut container = StateContainer::new("idle");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        container.on_change(move |t: StateTransition<&str>| {
            sink.lock().push((t.previous, t.current));
        });

        container.set("loading");
        container.set("ready");

        assert_eq!(
            *seen.lock(),
            vec![
                (Some("idle"), "idle"),
                (Some("idle"), "loading"),
                (Some("loading"), "ready"),
            ]
        );
        assert_eq!(*container.current(), "ready");
        assert_eq!(container.previous(), Some(&"loading"));
    }

    #[test]
    fn test_on_change_once_is_consumed_by_the_sticky_replay() {
        let mut container = StateContainer::new(0i32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        container.on_change_once(move |t| sink.lock().push(t.current));
        container.set(1);
        container.set(2);
        assert_eq!(*seen.lock(), vec![0], "replay is the single firing");
    }

    #[test]
    fn test_raw_subscriber_decodes_the_documented_keys() {
        let container = StateContainer::new(5u8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        container.bus().subscribe(STATE_CHANGE_EVENT, move |e| {
            let t = StateTransition::<u8>::from_event(e).unwrap();
            sink.lock().push((t.previous, t.current));
        });
        assert_eq!(*seen.lock(), vec![(Some(5), 5)]);
    }

    #[test]
    fn test_wrong_type_decode_fails_explicitly() {
        let container = StateContainer::new(1u16);
        let result = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&result);

        container.bus().subscribe(STATE_CHANGE_EVENT, move |e| {
            *sink.lock() = Some(StateTransition::<String>::from_event(e));
        });

        let decoded = result.lock().take().expect("sticky replay must have fired");
        let err = decoded.unwrap_err();
        assert_eq!(err.as_label(), "payload_type_mismatch");
        assert_eq!(err.key(), PREVIOUS_KEY);
    }

    #[test]
    fn test_no_transition_validation() {
        // Any value in any order is legal; the container never rejects a set.
        let mut c = StateContainer::new(3u32);
        c.set(3);
        c.set(1);
        c.set(100);
        assert_eq!(*c.current(), 100);
        assert_eq!(c.previous(), Some(&1));
    }
}
