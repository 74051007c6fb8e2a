//! Discovery announcements
//!
//! After joining the network (and on request) the device broadcasts a short
//! burst of announcements so companion apps can find it without configuration:
//!
//! ```text
//! OPENHANDY_DISCOVERY ip=192.168.1.42 host=openhandy tcode=8000 dport=5390
//! ```

use core::fmt::Write;

use heapless::String;

/// First token of every announcement
pub const DISCOVERY_PREFIX: &str = "OPENHANDY_DISCOVERY";

/// UDP port announcements are broadcast to
pub const DISCOVERY_PORT: u16 = 5390;

/// Number of packets in one burst
pub const BURST_PACKETS: u8 = 5;

/// Spacing between packets of a burst
pub const BURST_INTERVAL_MS: u32 = 1000;

/// Encoded announcement buffer size
pub const ANNOUNCEMENT_LEN: usize = 128;

/// Contents of a discovery announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Announcement<'a> {
    pub ip: [u8; 4],
    pub hostname: &'a str,
    /// Port the device listens on for commands
    pub command_port: u16,
}

impl Announcement<'_> {
    /// Render the announcement text
    ///
    /// Overlong hostnames are truncated to fit the buffer.
    pub fn encode(&self) -> String<ANNOUNCEMENT_LEN> {
        let mut out = String::new();
        let [a, b, c, d] = self.ip;
        let _ = write!(out, "{} ip={}.{}.{}.{} host=", DISCOVERY_PREFIX, a, b, c, d);

        // Leave room for the fixed tail (" tcode=65535 dport=5390")
        let tail_room = 24;
        for ch in self.hostname.chars() {
            if out.len() + ch.len_utf8() + tail_room > ANNOUNCEMENT_LEN {
                break;
            }
            let _ = out.push(ch);
        }

        let _ = write!(out, " tcode={} dport={}", self.command_port, DISCOVERY_PORT);
        out
    }
}

/// Paces a burst of announcements
///
/// Times are milliseconds from a free-running wrapping clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryBurst {
    remaining: u8,
    next_fire_ms: u32,
}

impl DiscoveryBurst {
    pub const fn new() -> Self {
        Self {
            remaining: 0,
            next_fire_ms: 0,
        }
    }

    /// Start (or restart) a burst; the first packet is due immediately
    pub fn trigger(&mut self, now_ms: u32) {
        self.remaining = BURST_PACKETS;
        self.next_fire_ms = now_ms;
    }

    /// Returns true when a packet should be sent now
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if self.remaining == 0 {
            return false;
        }
        // Signed difference handles clock wraparound
        if (now_ms.wrapping_sub(self.next_fire_ms) as i32) < 0 {
            return false;
        }
        self.remaining -= 1;
        self.next_fire_ms = now_ms.wrapping_add(BURST_INTERVAL_MS);
        true
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }
}
