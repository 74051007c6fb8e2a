//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod buttons;
pub mod control;
pub mod encoder;
pub mod udp;

pub use buttons::button_task;
pub use control::control_task;
pub use encoder::encoder_task;
pub use udp::udp_task;
