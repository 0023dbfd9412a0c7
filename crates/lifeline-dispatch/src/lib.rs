//! The Lifeline dispatch engine: an emergency is a task, ambulances and
//! facilities are resources, and the engine matches, assigns and emits.

pub mod alerts;
pub mod resources;

pub use alerts::AlertStateMachine;
pub use resources::ResourceRegistry;
