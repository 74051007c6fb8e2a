//! Run-state machine
//!
//! The state machine is explicit, finite, and deterministic. It is owned by
//! the motion controller; everything else only reads it.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::RunState;
