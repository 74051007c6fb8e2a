//! Manual control surface
//!
//! One canonical set of manual settings, mutated by the local buttons and
//! by remote admin requests.

pub mod buttons;
pub mod manual;

pub use buttons::{Button, ButtonAction, LONG_PRESS_MS};
pub use manual::{CropError, ManualUiState, DEFAULT_SPEED_PCT, SPEED_STEP};
