//! # Dynamically typed event payloads.
//!
//! A [`Payload`] is an open-ended `key → value` map attached to one emission.
//! Keys are strings; values are opaque to the bus — it stores and forwards
//! them without ever inspecting their contents. Consumers recover typed
//! values with a **checked** downcast that fails explicitly on a missing key
//! or a type mismatch, never by silently handing back a default.
//!
//! ## Rules
//! - Values are shared, not copied: a payload clone is a map of `Arc` clones,
//!   so replaying a sticky payload to a late subscriber is cheap.
//! - A payload is immutable by convention once emitted; builders construct it
//!   up front via [`Payload::with`].
//! - Expected keys and their types are a contract between producer and
//!   consumer for each event name (see [`StateContainer`](crate::StateContainer)
//!   for the `"statechange"` contract).
//!
//! ## Example
//! ```rust
//! use stickybus::Payload;
//!
//! let payload = Payload::new()
//!     .with("attempt", 3u32)
//!     .with("reason", String::from("timeout"));
//!
//! assert_eq!(payload.get::<u32>("attempt"), Ok(&3));
//! assert!(payload.get::<u64>("attempt").is_err()); // wrong type, explicit failure
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::PayloadError;

/// A single opaque payload value.
///
/// Values must be `Send + Sync` because payloads cross threads when an
/// emission is deferred onto the bus's home thread.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Dynamically typed `key → value` map carried by one [`Event`](crate::Event).
///
/// Cheap to clone (values are `Arc`-shared). The empty payload is the default
/// for emissions that carry no data.
#[derive(Clone, Default)]
pub struct Payload {
    entries: HashMap<String, Value>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value under `key`, replacing any previous value, and returns
    /// the payload for chaining.
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.entries.insert(key.into(), Arc::new(value));
        self
    }

    /// Returns a typed reference to the value under `key`.
    ///
    /// Fails with [`PayloadError::MissingKey`] when the key is absent and
    /// [`PayloadError::TypeMismatch`] when the stored value is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<&T, PayloadError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| PayloadError::MissingKey { key: key.into() })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| PayloadError::TypeMismatch {
                key: key.into(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Returns a clone of the value under `key`.
    ///
    /// Same failure modes as [`Payload::get`].
    pub fn get_cloned<T: Any + Send + Sync + Clone>(&self, key: &str) -> Result<T, PayloadError> {
        self.get::<T>(key).cloned()
    }

    /// Returns `true` if the payload holds a value under `key` (of any type).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the payload carries no data.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys present in the payload.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Payload {
    // Values are opaque; only the keys are printable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Payload").field("keys", &keys).finish()
    }
}
