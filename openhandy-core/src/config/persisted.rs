//! Persisted configuration record
//!
//! Tunables and network settings live in one record so a format change
//! wipes everything at once. Layout on flash:
//!
//! ```text
//! postcard(magic, version) | postcard(tunables, network) | crc32 (LE)
//! ```
//!
//! The CRC covers every byte before it.

use serde::{Deserialize, Serialize};

use super::network::NetworkConfig;
use super::tunables::{ConfigFaults, Tunables};

/// Magic number identifying a config record
pub const CONFIG_MAGIC: u32 = 0x4F48_4346; // "OHCF"

/// Current record layout version
pub const CONFIG_VERSION: u8 = 1;

/// Buffer size that always fits an encoded record
pub const STORED_CONFIG_MAX_LEN: usize = 256;

const CRC_LEN: usize = 4;

/// Errors that can occur while encoding or decoding the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Output buffer too small
    BufferTooSmall,
    /// Record shorter than its fixed parts
    Truncated,
    /// Checksum mismatch
    BadCrc,
    /// Not a config record
    BadMagic,
    /// Record written by a different layout version
    VersionMismatch(u8),
    /// Body failed to deserialize
    Malformed,
}

/// The unified configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredConfig {
    pub magic: u32,
    pub version: u8,
    pub tunables: Tunables,
    pub network: NetworkConfig,
    /// CRC32 of the encoded bytes preceding it
    pub crc: u32,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self::new(Tunables::DEFAULT, NetworkConfig::default())
    }
}

impl StoredConfig {
    pub fn new(tunables: Tunables, network: NetworkConfig) -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            tunables,
            network,
            crc: 0,
        }
    }

    /// Encode into `buf`, returning the number of bytes written
    ///
    /// The `crc` field is recomputed.
    pub fn encode(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let header_len = postcard::to_slice(&(self.magic, self.version), buf)
            .map_err(|_| StoreError::BufferTooSmall)?
            .len();
        let body_len = postcard::to_slice(&(&self.tunables, &self.network), &mut buf[header_len..])
            .map_err(|_| StoreError::BufferTooSmall)?
            .len();

        let len = header_len + body_len;
        if buf.len() < len + CRC_LEN {
            return Err(StoreError::BufferTooSmall);
        }

        self.crc = crc32(&buf[..len]);
        buf[len..len + CRC_LEN].copy_from_slice(&self.crc.to_le_bytes());
        Ok(len + CRC_LEN)
    }

    /// Decode and verify a record
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() <= CRC_LEN {
            return Err(StoreError::Truncated);
        }
        let (data, crc_bytes) = bytes.split_at(bytes.len() - CRC_LEN);
        let mut stored = [0u8; CRC_LEN];
        stored.copy_from_slice(crc_bytes);
        let crc = u32::from_le_bytes(stored);

        if crc32(data) != crc {
            return Err(StoreError::BadCrc);
        }

        let ((magic, version), body): ((u32, u8), &[u8]) =
            postcard::take_from_bytes(data).map_err(|_| StoreError::Truncated)?;
        if magic != CONFIG_MAGIC {
            return Err(StoreError::BadMagic);
        }
        if version != CONFIG_VERSION {
            return Err(StoreError::VersionMismatch(version));
        }

        let (tunables, network): (Tunables, NetworkConfig) =
            postcard::from_bytes(body).map_err(|_| StoreError::Malformed)?;

        Ok(Self {
            magic,
            version,
            tunables,
            network,
            crc,
        })
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigSource {
    /// No record was stored
    Defaults,
    /// Record decoded successfully
    Stored,
    /// Record was unusable; defaults substituted
    Replaced(StoreError),
}

/// Result of resolving the boot configuration
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub tunables: Tunables,
    pub network: NetworkConfig,
    pub source: ConfigSource,
    /// Individual fields substituted during validation
    pub faults: ConfigFaults,
}

impl LoadedConfig {
    /// Whether the stored record should be overwritten with the active one
    pub fn needs_rewrite(&self) -> bool {
        matches!(self.source, ConfigSource::Replaced(_))
    }
}

/// Resolve the active configuration from an optional stored record
pub fn load_or_default(stored: Option<&[u8]>) -> LoadedConfig {
    let (record, source) = match stored.map(StoredConfig::decode) {
        None => (StoredConfig::default(), ConfigSource::Defaults),
        Some(Ok(record)) => (record, ConfigSource::Stored),
        Some(Err(e)) => (StoredConfig::default(), ConfigSource::Replaced(e)),
    };

    let (tunables, mut faults) = record.tunables.validated();
    let mut network = record.network;
    network.validate_into(&mut faults);

    LoadedConfig {
        tunables,
        network,
        source,
        faults,
    }
}

/// CRC32 (IEEE 802.3 polynomial)
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc: u32 = 0xFFFF_FFFF;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tunables::ConfigField;

    fn encoded(config: &mut StoredConfig) -> std::vec::Vec<u8> {
        let mut buf = [0u8; STORED_CONFIG_MAX_LEN];
        let len = config.encode(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    #[test]
    fn test_crc32_known_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_record_survives_storage() {
        let mut config = StoredConfig::default();
        config.tunables.kp = 1.25;
        config.network.udp_port = 9000;

        let bytes = encoded(&mut config);
        let decoded = StoredConfig::decode(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = encoded(&mut StoredConfig::default());
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x55;
        assert_eq!(StoredConfig::decode(&bytes), Err(StoreError::BadCrc));
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = StoredConfig::default();
        config.version = CONFIG_VERSION + 1;
        let bytes = encoded(&mut config);
        assert_eq!(
            StoredConfig::decode(&bytes),
            Err(StoreError::VersionMismatch(CONFIG_VERSION + 1))
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut config = StoredConfig::default();
        config.magic = 0x1234_5678;
        let bytes = encoded(&mut config);
        assert_eq!(StoredConfig::decode(&bytes), Err(StoreError::BadMagic));
    }

    #[test]
    fn test_truncated() {
        assert_eq!(StoredConfig::decode(&[1, 2, 3]), Err(StoreError::Truncated));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 8];
        assert_eq!(
            StoredConfig::default().encode(&mut buf),
            Err(StoreError::BufferTooSmall)
        );
    }

    #[test]
    fn test_load_absent_uses_defaults() {
        let loaded = load_or_default(None);
        assert_eq!(loaded.source, ConfigSource::Defaults);
        assert_eq!(loaded.tunables, Tunables::DEFAULT);
        assert!(!loaded.needs_rewrite());
    }

    #[test]
    fn test_load_mismatch_requests_rewrite() {
        let mut config = StoredConfig::default();
        config.version = 0;
        let bytes = encoded(&mut config);

        let loaded = load_or_default(Some(&bytes));
        assert_eq!(loaded.source, ConfigSource::Replaced(StoreError::VersionMismatch(0)));
        assert!(loaded.needs_rewrite());
        assert_eq!(loaded.tunables, Tunables::DEFAULT);
    }

    #[test]
    fn test_load_substitutes_invalid_fields() {
        let mut config = StoredConfig::default();
        config.tunables.stall_timeout_ms = 5;
        config.tunables.kp = 2.0;
        let bytes = encoded(&mut config);

        let loaded = load_or_default(Some(&bytes));
        assert_eq!(loaded.source, ConfigSource::Stored);
        assert_eq!(loaded.tunables.kp, 2.0);
        assert_eq!(loaded.tunables.stall_timeout_ms, 1500);
        assert_eq!(loaded.faults.len(), 1);
        assert_eq!(loaded.faults[0].field, ConfigField::StallTimeoutMs);
    }
}
