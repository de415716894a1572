//! # Bus construction configuration.
//!
//! Provides [`BusConfig`] — pre-allocation hints for the internal tables of an
//! [`EventBus`](crate::EventBus).
//!
//! These are capacity hints only; the tables grow past them as needed. The
//! defaults suit a typical UI screen with a handful of event names.

/// Construction-time configuration for an [`EventBus`](crate::EventBus).
///
/// ## Field semantics
/// - `names_capacity`: initial capacity of the per-name subscriber table
/// - `sticky_capacity`: initial capacity of the sticky payload table
///
/// All fields are public; `Default` gives small sensible values.
#[derive(Clone, Copy, Debug)]
pub struct BusConfig {
    /// Initial capacity of the subscriber table (distinct event names).
    pub names_capacity: usize,
    /// Initial capacity of the sticky slot table (distinct sticky names).
    pub sticky_capacity: usize,
}

impl Default for BusConfig {
    /// Returns a configuration with:
    /// - `names_capacity = 8`;
    /// - `sticky_capacity = 4`.
    fn default() -> Self {
        Self {
            names_capacity: 8,
            sticky_capacity: 4,
        }
    }
}
