//! Position sensors

pub mod hall;

pub use hall::{HallDecoder, HallState};
