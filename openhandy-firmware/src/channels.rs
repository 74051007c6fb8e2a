//! Inter-task communication channels
//!
//! Static channels and signals shared between Embassy tasks. The control
//! task owns the motion controller; everything else talks to it through
//! these.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use portable_atomic::{AtomicU32, Ordering};

use openhandy_core::status::StatusSnapshot;
use openhandy_core::ui::ButtonAction;
use openhandy_hal::PositionCounter;
use openhandy_protocol::MAX_DATAGRAM_LEN;

/// Inbound datagrams waiting for the control task
const INBOX_SIZE: usize = 8;

/// Channel capacity for button actions
const BUTTON_CHANNEL_SIZE: usize = 8;

/// Channel capacity for discovery announcements
const DISCOVERY_CHANNEL_SIZE: usize = 2;

/// Raw datagram payload
pub type Datagram = Vec<u8, MAX_DATAGRAM_LEN>;

/// Datagrams received on the command port
pub static INBOX: Channel<CriticalSectionRawMutex, Datagram, INBOX_SIZE> = Channel::new();

/// Datagrams lost to a full inbox, not yet counted by the control task
pub static INBOX_OVERFLOW: AtomicU32 = AtomicU32::new(0);

/// Oversized datagrams dropped by the UDP task, not yet counted
pub static INBOX_TRUNCATED: AtomicU32 = AtomicU32::new(0);

/// Button actions from the button tasks
pub static BUTTON_CHANNEL: Channel<CriticalSectionRawMutex, ButtonAction, BUTTON_CHANNEL_SIZE> =
    Channel::new();

/// One entry per discovery announcement due
pub static DISCOVERY_OUT: Channel<CriticalSectionRawMutex, (), DISCOVERY_CHANNEL_SIZE> =
    Channel::new();

/// Start a discovery burst (set once the network is up)
pub static DISCOVERY_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Latest controller snapshot
pub static STATUS: Signal<CriticalSectionRawMutex, StatusSnapshot> = Signal::new();

/// Hall encoder count (written by the encoder task only)
pub static POSITION: PositionCounter = PositionCounter::new();

/// Take and clear the inbox overflow count
pub fn take_inbox_overflow() -> u32 {
    INBOX_OVERFLOW.swap(0, Ordering::Relaxed)
}

/// Take and clear the oversized datagram count
pub fn take_inbox_truncated() -> u32 {
    INBOX_TRUNCATED.swap(0, Ordering::Relaxed)
}
