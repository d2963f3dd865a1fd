//! # Console Configuration
//!
//! Configuration for one console session.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_VENUE_ID=...   TALLY_DEFAULT_STATUS=pending                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/console.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tally.tally/console.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     default venue, completed sales, night-shift hours                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [venue]
//! id = "00000000-0000-0000-0000-000000000001"
//! name = "Main Bar"
//!
//! [database]
//! path = "tally.db"
//! max_connections = 5
//!
//! [sales]
//! default_status = "completed"  # completed | pending
//! working_set_limit = 500
//!
//! [dashboard]
//! hours = [20, 21, 22, 23, 0, 1, 2, 3, 4, 5]
//! top_n = 5
//! utc_offset_minutes = -180
//! ```

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_core::{SaleStatus, DEFAULT_VENUE_ID};
use tally_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::subscriber::DEFAULT_WORKING_SET_LIMIT;

// =============================================================================
// Venue
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue every sale, subscription and report is scoped to.
    #[serde(default = "default_venue_id")]
    pub id: String,

    /// Display name for receipts and report headers.
    #[serde(default = "default_venue_name")]
    pub name: String,
}

fn default_venue_id() -> String {
    DEFAULT_VENUE_ID.to_string()
}

fn default_venue_name() -> String {
    "Main Bar".to_string()
}

impl Default for VenueConfig {
    fn default() -> Self {
        VenueConfig {
            id: default_venue_id(),
            name: default_venue_name(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, relative to the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tally.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl From<&DatabaseSettings> for DbConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        DbConfig::new(&settings.path).max_connections(settings.max_connections)
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Status new sales are submitted with: `completed` (pay now) or
    /// `pending` (open tab, confirmed later).
    #[serde(default)]
    pub default_status: SaleStatus,

    /// Newest sales kept in the working set after a reconcile.
    #[serde(default = "default_working_set_limit")]
    pub working_set_limit: i64,
}

fn default_working_set_limit() -> i64 {
    DEFAULT_WORKING_SET_LIMIT
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            default_status: SaleStatus::Completed,
            working_set_limit: default_working_set_limit(),
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Local hours shown in the sales-by-hour chart, in display order.
    #[serde(default = "default_hours")]
    pub hours: Vec<u32>,

    /// Rows in each top-N table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Offset of venue local time from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_hours() -> Vec<u32> {
    vec![20, 21, 22, 23, 0, 1, 2, 3, 4, 5]
}

fn default_top_n() -> usize {
    5
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            hours: default_hours(),
            top_n: default_top_n(),
            utc_offset_minutes: 0,
        }
    }
}

impl DashboardSettings {
    /// The configured offset. Validated configs always have one.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub venue: VenueConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (console.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading console config from file");
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
            warn!("Failed to load console config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Console config saved");
        Ok(())
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.venue.id.trim().is_empty() {
            return Err(SessionError::InvalidConfig("venue.id must not be empty".into()));
        }

        if self.sales.default_status.is_terminal() {
            return Err(SessionError::InvalidConfig(format!(
                "sales.default_status must be completed or pending, got: {}",
                self.sales.default_status
            )));
        }

        if self.sales.working_set_limit <= 0 {
            return Err(SessionError::InvalidConfig(
                "sales.working_set_limit must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(SessionError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.dashboard.top_n == 0 {
            return Err(SessionError::InvalidConfig(
                "dashboard.top_n must be greater than 0".into(),
            ));
        }

        if let Some(hour) = self.dashboard.hours.iter().find(|h| **h > 23) {
            return Err(SessionError::InvalidConfig(format!(
                "dashboard.hours must be 0-23, got: {}",
                hour
            )));
        }

        // FixedOffset accepts strictly less than a day
        if self.dashboard.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(SessionError::InvalidConfig(format!(
                "dashboard.utc_offset_minutes out of range: {}",
                self.dashboard.utc_offset_minutes
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("TALLY_VENUE_ID") {
            debug!(venue_id = %id, "Overriding venue ID from environment");
            self.venue.id = id;
        }

        if let Ok(name) = std::env::var("TALLY_VENUE_NAME") {
            self.venue.name = name;
        }

        if let Ok(path) = std::env::var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(status) = std::env::var("TALLY_DEFAULT_STATUS") {
            match status.parse::<SaleStatus>() {
                Ok(parsed) => self.sales.default_status = parsed,
                Err(_) => warn!(status = %status, "Unknown default status in environment"),
            }
        }

        if let Ok(limit) = std::env::var("TALLY_WORKING_SET_LIMIT") {
            if let Ok(n) = limit.parse::<i64>() {
                self.sales.working_set_limit = n;
            }
        }

        if let Ok(top_n) = std::env::var("TALLY_TOP_N") {
            if let Ok(n) = top_n.parse::<usize>() {
                self.dashboard.top_n = n;
            }
        }

        if let Ok(offset) = std::env::var("TALLY_UTC_OFFSET_MINUTES") {
            if let Ok(minutes) = offset.parse::<i32>() {
                debug!(minutes, "Overriding UTC offset from environment");
                self.dashboard.utc_offset_minutes = minutes;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("console.toml"))
    }

    pub fn venue_id(&self) -> &str {
        &self.venue.id
    }

    pub fn venue_name(&self) -> &str {
        &self.venue.name
    }

    pub fn default_status(&self) -> SaleStatus {
        self.sales.default_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.venue_id(), DEFAULT_VENUE_ID);
        assert_eq!(config.default_status(), SaleStatus::Completed);
        assert_eq!(config.dashboard.hours.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ConsoleConfig::default();

        config.sales.default_status = SaleStatus::Refunded;
        assert!(config.validate().is_err());
        config.sales.default_status = SaleStatus::Pending;
        assert!(config.validate().is_ok());

        config.dashboard.hours = vec![22, 24];
        assert!(config.validate().is_err());
        config.dashboard.hours = vec![22, 23];

        config.dashboard.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
        config.dashboard.utc_offset_minutes = -180;
        assert!(config.validate().is_ok());

        config.sales.working_set_limit = 0;
        assert!(config.validate().is_err());
        config.sales.working_set_limit = 50;
        assert!(config.validate().is_ok());

        config.venue.id = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_settings_build_pool_config() {
        let settings = DatabaseSettings {
            path: PathBuf::from("/var/lib/tally/rooftop.db"),
            max_connections: 3,
        };

        let db_config = DbConfig::from(&settings);
        assert_eq!(db_config.database_path, settings.path);
        assert_eq!(db_config.max_connections, 3);
        assert!(!db_config.is_in_memory());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ConsoleConfig = toml::from_str(
            r#"
            [sales]
            default_status = "pending"

            [dashboard]
            top_n = 3
            utc_offset_minutes = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.default_status(), SaleStatus::Pending);
        assert_eq!(config.dashboard.top_n, 3);
        assert_eq!(config.dashboard.hours, default_hours());
        assert_eq!(config.sales.working_set_limit, DEFAULT_WORKING_SET_LIMIT);
        assert_eq!(config.dashboard.offset().local_minus_utc(), 7200);
        assert_eq!(config.venue.name, "Main Bar");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("tally-config-{}", uuid::Uuid::new_v4()))
            .join("console.toml");

        let mut config = ConsoleConfig::default();
        config.venue.name = "Rooftop".into();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[venue]"));
        assert!(contents.contains("[dashboard]"));

        let loaded: ConsoleConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.venue.name, "Rooftop");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
