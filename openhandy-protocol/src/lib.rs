//! OpenHandy network command protocol
//!
//! This crate defines the UDP-based protocol between companion apps and the
//! actuator. Everything is plain text so that any scripting tool can drive
//! the device:
//!
//! ```text
//!   companion app ──(UDP :udp_port)──►  "L05000I250\n"            TCode stroke command
//!   companion app ──(UDP :udp_port)──►  "action=setspeed&sp=40"   motion request
//!   actuator      ──(UDP bcast :5390)─► "OPENHANDY_DISCOVERY ip=… host=… tcode=… dport=5390"
//! ```
//!
//! The crate only decodes and encodes. Deciding whether a decoded command may
//! be applied is the job of the motion core.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod datagram;
pub mod discovery;
pub mod motion;
pub mod tcode;

pub use datagram::{decode_datagram, DecodeError, Inbound, MAX_DATAGRAM_LEN};
pub use discovery::{Announcement, DiscoveryBurst, DISCOVERY_PORT, DISCOVERY_PREFIX};
pub use motion::{MotionRequest, MotionRequestError};
pub use tcode::{AxisCommand, AxisId, AxisKind, DeviceCommand, Extension, TCodeCommand, TCodeError};
