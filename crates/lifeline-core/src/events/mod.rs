//! Dispatch event system.
//!
//! Registries publish [`DispatchEvent`]s onto the [`EventBroadcaster`];
//! the server's fan-out router subscribes and delivers them to the right
//! subset of live sessions. Publishing is decoupled from delivery: the
//! broadcast channel never blocks the sender, so alert and resource state
//! changes succeed independently of whether any listener is reachable.

pub mod broadcaster;
pub mod types;

pub use broadcaster::EventBroadcaster;
pub use types::DispatchEvent;
