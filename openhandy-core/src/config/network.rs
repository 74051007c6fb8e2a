//! Network settings
//!
//! Provisioning happens elsewhere; the firmware only consumes these values
//! to join the network and bind the command socket.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use heapless::String;

use super::tunables::{ConfigFault, ConfigFaults, ConfigField};

/// Default UDP command port
pub const DEFAULT_UDP_PORT: u16 = 8000;

/// Default hostname
pub const DEFAULT_HOSTNAME: &str = "openhandy";

/// Network settings record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    pub hostname: String<32>,
    /// Use DHCP; when false the static fields below apply
    pub use_dhcp: bool,
    pub ip: [u8; 4],
    pub gateway: [u8; 4],
    pub netmask: [u8; 4],
    pub dns: [u8; 4],
    /// Port the command socket listens on
    pub udp_port: u16,
    /// Carried for the companion tooling, not used by the core
    pub boot_sound: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut hostname = String::new();
        // Fits: DEFAULT_HOSTNAME is shorter than the capacity
        let _ = hostname.push_str(DEFAULT_HOSTNAME);

        Self {
            ssid: String::new(),
            password: String::new(),
            hostname,
            use_dhcp: true,
            ip: [0; 4],
            gateway: [0; 4],
            netmask: [255, 255, 255, 0],
            dns: [0; 4],
            udp_port: DEFAULT_UDP_PORT,
            boot_sound: true,
        }
    }
}

impl NetworkConfig {
    /// Whether credentials are present
    pub fn is_provisioned(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// Prefix length of the static netmask, if it is contiguous
    pub fn prefix_len(&self) -> Option<u8> {
        let mask = u32::from_be_bytes(self.netmask);
        let ones = mask.leading_ones();
        (mask.checked_shl(ones).unwrap_or(0) == 0).then_some(ones as u8)
    }

    /// Replace invalid fields with defaults, appending to `faults`
    pub fn validate_into(&mut self, faults: &mut ConfigFaults) {
        let defaults = NetworkConfig::default();

        let valid_hostname = !self.hostname.is_empty()
            && self
                .hostname
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid_hostname {
            self.hostname = defaults.hostname;
            let _ = faults.push(ConfigFault {
                field: ConfigField::Hostname,
            });
        }

        if self.udp_port == 0 {
            self.udp_port = DEFAULT_UDP_PORT;
            let _ = faults.push(ConfigFault {
                field: ConfigField::UdpPort,
            });
        }

        if !self.use_dhcp && self.prefix_len().is_none() {
            self.netmask = defaults.netmask;
            let _ = faults.push(ConfigFault {
                field: ConfigField::Netmask,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let net = NetworkConfig::default();
        assert_eq!(net.hostname.as_str(), "openhandy");
        assert_eq!(net.udp_port, 8000);
        assert!(net.use_dhcp);
        assert!(!net.is_provisioned());
    }

    #[test]
    fn test_prefix_len() {
        let mut net = NetworkConfig::default();
        assert_eq!(net.prefix_len(), Some(24));

        net.netmask = [255, 255, 0, 255];
        assert_eq!(net.prefix_len(), None);

        net.netmask = [255, 255, 255, 255];
        assert_eq!(net.prefix_len(), Some(32));

        net.netmask = [0, 0, 0, 0];
        assert_eq!(net.prefix_len(), Some(0));
    }

    #[test]
    fn test_invalid_fields_replaced() {
        let mut net = NetworkConfig {
            hostname: String::try_from("bad host!").unwrap(),
            udp_port: 0,
            use_dhcp: false,
            netmask: [255, 0, 255, 0],
            ..NetworkConfig::default()
        };
        let mut faults = ConfigFaults::new();
        net.validate_into(&mut faults);

        assert_eq!(net.hostname.as_str(), DEFAULT_HOSTNAME);
        assert_eq!(net.udp_port, DEFAULT_UDP_PORT);
        assert_eq!(net.netmask, [255, 255, 255, 0]);
        assert_eq!(faults.len(), 3);
    }
}
