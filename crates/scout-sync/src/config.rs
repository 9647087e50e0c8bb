//! # Scout Configuration
//!
//! Configuration management for the sync engine and the CLI.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SCOUT_API_URL=https://api.shelfscout.app/v1                        │
//! │     SCOUT_DEVICE_ID=abc-123                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scout/scout.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.shelfscout.scout/scout.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     auto-generated device_id, 24h price TTL, retry ceiling 3           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scout.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Pixel in the van"
//!
//! [api]
//! base_url = "https://api.shelfscout.app/v1"
//! request_timeout_secs = 30
//!
//! [sync]
//! poll_interval_secs = 10
//!
//! [cache]
//! price_ttl_hours = 24
//! retry_ceiling = 3
//!
//! [pricing]
//! assumed_cost_cents = 200
//! fee_rate_bps = 1500
//! ```

use scout_core::money::Money;
use scout_core::types::Rate;
use scout_core::{CachePolicy, PricingPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Scout Device".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// API Settings
// =============================================================================

/// Where the scouting backend lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL; endpoint paths are joined onto it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent on every request.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file; defaults to `<data dir>/scout.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between status polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound on an explicit sync (seconds).
    #[serde(default = "default_force_sync_timeout")]
    pub force_sync_timeout_secs: u64,

    /// First delay after a failed status poll (milliseconds).
    #[serde(default = "default_status_backoff_initial")]
    pub status_backoff_initial_ms: u64,

    /// Longest delay between failing status polls (seconds).
    #[serde(default = "default_status_backoff_max")]
    pub status_backoff_max_secs: u64,
}

fn default_poll_interval() -> u64 {
    10
}
fn default_force_sync_timeout() -> u64 {
    30
}
fn default_status_backoff_initial() -> u64 {
    1000
}
fn default_status_backoff_max() -> u64 {
    120
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            poll_interval_secs: default_poll_interval(),
            force_sync_timeout_secs: default_force_sync_timeout(),
            status_backoff_initial_ms: default_status_backoff_initial(),
            status_backoff_max_secs: default_status_backoff_max(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Lifetimes and the retry ceiling, mirrored into [`CachePolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_price_ttl")]
    pub price_ttl_hours: u32,

    #[serde(default = "default_price_retention")]
    pub price_retention_days: u32,

    #[serde(default = "default_image_retention")]
    pub image_retention_days: u32,

    /// Failed attempts before a queued scan is quarantined.
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,
}

fn default_price_ttl() -> u32 {
    scout_core::DEFAULT_PRICE_TTL_HOURS
}
fn default_price_retention() -> u32 {
    scout_core::DEFAULT_PRICE_RETENTION_DAYS
}
fn default_image_retention() -> u32 {
    scout_core::DEFAULT_IMAGE_RETENTION_DAYS
}
fn default_retry_ceiling() -> u32 {
    scout_core::DEFAULT_RETRY_CEILING
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            price_ttl_hours: default_price_ttl(),
            price_retention_days: default_price_retention(),
            image_retention_days: default_image_retention(),
            retry_ceiling: default_retry_ceiling(),
        }
    }
}

impl CacheSettings {
    pub fn to_policy(&self) -> CachePolicy {
        CachePolicy {
            price_ttl_hours: self.price_ttl_hours,
            price_retention_days: self.price_retention_days,
            image_retention_days: self.image_retention_days,
            retry_ceiling: self.retry_ceiling,
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Profit and estimate knobs in flat, file-friendly units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_assumed_cost")]
    pub assumed_cost_cents: i64,

    #[serde(default = "default_fee_rate")]
    pub fee_rate_bps: u32,

    #[serde(default = "default_base_price")]
    pub base_price_cents: i64,

    #[serde(default = "default_author_markup")]
    pub author_markup_bps: u32,

    #[serde(default = "default_publisher_increment")]
    pub publisher_increment_cents: i64,

    #[serde(default = "default_jitter")]
    pub jitter_bps: u32,

    #[serde(default = "default_marketplace_b_multiplier")]
    pub marketplace_b_multiplier_bps: u32,

    #[serde(default = "scout_core::policy::default_high_demand_authors")]
    pub high_demand_authors: Vec<String>,

    #[serde(default = "scout_core::policy::default_premium_publishers")]
    pub premium_publishers: Vec<String>,
}

fn default_assumed_cost() -> i64 {
    PricingPolicy::default().assumed_cost.cents()
}
fn default_fee_rate() -> u32 {
    PricingPolicy::default().fee_rate.bps()
}
fn default_base_price() -> i64 {
    PricingPolicy::default().base_price.cents()
}
fn default_author_markup() -> u32 {
    PricingPolicy::default().author_markup.bps()
}
fn default_publisher_increment() -> i64 {
    PricingPolicy::default().publisher_increment.cents()
}
fn default_jitter() -> u32 {
    PricingPolicy::default().jitter.bps()
}
fn default_marketplace_b_multiplier() -> u32 {
    PricingPolicy::default().marketplace_b_multiplier.bps()
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings::from(&PricingPolicy::default())
    }
}

impl From<&PricingPolicy> for PricingSettings {
    fn from(policy: &PricingPolicy) -> Self {
        PricingSettings {
            assumed_cost_cents: policy.assumed_cost.cents(),
            fee_rate_bps: policy.fee_rate.bps(),
            base_price_cents: policy.base_price.cents(),
            author_markup_bps: policy.author_markup.bps(),
            publisher_increment_cents: policy.publisher_increment.cents(),
            jitter_bps: policy.jitter.bps(),
            marketplace_b_multiplier_bps: policy.marketplace_b_multiplier.bps(),
            high_demand_authors: policy.high_demand_authors.clone(),
            premium_publishers: policy.premium_publishers.clone(),
        }
    }
}

impl PricingSettings {
    pub fn to_policy(&self) -> PricingPolicy {
        PricingPolicy {
            assumed_cost: Money::from_cents(self.assumed_cost_cents),
            fee_rate: Rate::from_bps(self.fee_rate_bps),
            base_price: Money::from_cents(self.base_price_cents),
            author_markup: Rate::from_bps(self.author_markup_bps),
            publisher_increment: Money::from_cents(self.publisher_increment_cents),
            jitter: Rate::from_bps(self.jitter_bps),
            marketplace_b_multiplier: Rate::from_bps(self.marketplace_b_multiplier_bps),
            high_demand_authors: self.high_demand_authors.clone(),
            premium_publishers: self.premium_publishers.clone(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Shelf Scout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub pricing: PricingSettings,
}

impl ScoutConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, returning the path written.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scout config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.sync.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        if self.sync.force_sync_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "force_sync_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.cache.retry_ceiling == 0 {
            return Err(SyncError::InvalidConfig(
                "retry_ceiling must be greater than 0".into(),
            ));
        }

        if self.cache.price_ttl_hours == 0 {
            return Err(SyncError::InvalidConfig(
                "price_ttl_hours must be greater than 0".into(),
            ));
        }

        if self.pricing.fee_rate_bps > 10_000 {
            return Err(SyncError::InvalidConfig(
                "fee_rate_bps cannot exceed 10000 (100%)".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SCOUT_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(url) = std::env::var("SCOUT_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(token) = std::env::var("SCOUT_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Ok(path) = std::env::var("SCOUT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Ok(interval) = std::env::var("SCOUT_POLL_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => self.sync.poll_interval_secs = secs,
                Err(_) => warn!(value = %interval, "Ignoring invalid SCOUT_POLL_INTERVAL_SECS"),
            }
        }

        if let Ok(ceiling) = std::env::var("SCOUT_RETRY_CEILING") {
            match ceiling.parse::<u32>() {
                Ok(n) => self.cache.retry_ceiling = n,
                Err(_) => warn!(value = %ceiling, "Ignoring invalid SCOUT_RETRY_CEILING"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shelfscout", "scout")
            .map(|dirs| dirs.config_dir().join("scout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Configured database file, falling back to the platform data dir.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage.database_path.clone().or_else(|| {
            directories::ProjectDirs::from("com", "shelfscout", "scout")
                .map(|dirs| dirs.data_dir().join("scout.db"))
        })
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache.to_policy()
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        self.pricing.to_policy()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }
}
