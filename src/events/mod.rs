//! # Event Broadcasting Module
//!
//! State-change notifications for every connected client. Anything that
//! mutates the shared playback picture — a transition in the playback
//! controller, a finished upload, a failed announcement — publishes an
//! [`Event`] through the [`hub::EventHub`], which fans it out to all
//! registered WebSocket observers.
//!
//! Broadcasting is pure fan-out: the hub knows nothing about why an event
//! was published, and publishers know nothing about who is connected.

pub mod hub;

pub use hub::{Event, EventHub, PushEvent};
