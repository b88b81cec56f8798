//! Shared infrastructure for the resilient-http crates.
//!
//! The circuit breaker and retry crates both report what they do through the
//! event types defined here, so one listener style works for every pattern.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
