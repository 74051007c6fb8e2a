//! Configuration persistence
//!
//! Loads the unified config record from flash and writes it back when the
//! stored copy was unusable.

use defmt::*;

use openhandy_core::config::persisted::STORED_CONFIG_MAX_LEN;
use openhandy_core::config::{
    load_or_default, ConfigSource, LoadedConfig, NetworkConfig, StoreError, StoredConfig,
    Tunables,
};
use openhandy_hal::{FlashError, FlashStorage, StorageKey};

/// Configuration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Flash operation failed
    Flash(FlashError),
    /// Record could not be encoded
    Encode(StoreError),
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}

impl From<StoreError> for ConfigError {
    fn from(e: StoreError) -> Self {
        ConfigError::Encode(e)
    }
}

/// Configuration persistence manager
pub struct ConfigPersistence<S> {
    storage: S,
}

impl<S: FlashStorage> ConfigPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Resolve the boot configuration
    ///
    /// Never fails: anything unreadable falls back to compiled defaults,
    /// and an unusable record is overwritten with them.
    pub async fn load(&mut self) -> LoadedConfig {
        info!("Loading configuration from flash...");

        let mut buffer = [0u8; STORED_CONFIG_MAX_LEN];
        let loaded = if !self.storage.exists(StorageKey::UnifiedConfig).await {
            load_or_default(None)
        } else {
            match self.storage.read(StorageKey::UnifiedConfig, &mut buffer).await {
                Ok(len) => load_or_default(Some(&buffer[..len])),
                Err(FlashError::NotFound) => load_or_default(None),
                Err(e) => {
                    warn!("Config read failed: {:?}", e);
                    // An empty record decodes as truncated and gets replaced
                    load_or_default(Some(&buffer[..0]))
                }
            }
        };

        log_config_summary(&loaded);

        if loaded.needs_rewrite() {
            match self.save(&loaded.tunables, &loaded.network).await {
                Ok(()) => info!("Config record rewritten with defaults"),
                Err(e) => warn!("Config rewrite failed: {:?}", e),
            }
        }

        loaded
    }

    /// Store a config record
    ///
    /// A full partition is erased once and the write retried.
    pub async fn save(
        &mut self,
        tunables: &Tunables,
        network: &NetworkConfig,
    ) -> Result<(), ConfigError> {
        let mut buffer = [0u8; STORED_CONFIG_MAX_LEN];
        let mut record = StoredConfig::new(*tunables, network.clone());
        let len = record.encode(&mut buffer)?;

        match self.storage.write(StorageKey::UnifiedConfig, &buffer[..len]).await {
            Err(FlashError::Full) | Err(FlashError::Corrupted) => {
                warn!("Config partition unusable, erasing");
                self.storage.erase_all().await?;
                self.storage
                    .write(StorageKey::UnifiedConfig, &buffer[..len])
                    .await?;
            }
            result => result?,
        }

        debug!("Stored {} byte config record", len);
        Ok(())
    }
}

/// Log where the configuration came from and every substituted field
fn log_config_summary(loaded: &LoadedConfig) {
    match loaded.source {
        ConfigSource::Defaults => info!("No stored configuration, using defaults"),
        ConfigSource::Stored => info!("Loaded stored configuration"),
        ConfigSource::Replaced(e) => warn!("Stored configuration unusable ({:?}), using defaults", e),
    }

    for fault in loaded.faults.iter() {
        warn!("Config field {:?} out of range, default substituted", fault.field);
    }

    debug!(
        "  kp={} max_pwm={} homing_pwm={} thermal={}",
        loaded.tunables.kp,
        loaded.tunables.max_pwm,
        loaded.tunables.homing_pwm,
        loaded.tunables.thermal_threshold_adc
    );
    debug!(
        "  host={} udp_port={} dhcp={}",
        loaded.network.hostname.as_str(),
        loaded.network.udp_port,
        loaded.network.use_dhcp
    );
}
