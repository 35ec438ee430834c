//! Environment-based configuration module
//!
//! Configuration can be set via:
//! 1. Environment variables (highest priority)
//! 2. .env file
//! 3. Default values (lowest priority)
//!
//! Loyalty values here are only defaults: they seed the `settings` table on
//! first migration, after which the stored values are authoritative.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

use crate::models::points::EarnType;

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Get environment from APP_ENV variable or default to Development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").unwrap_or_default().as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app_name: String,
    pub version: String,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub pricing: PricingConfig,
    pub loyalty: LoyaltyDefaults,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (relative to data dir)
    pub path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    pub log_to_file: bool,
    pub log_to_stdout: bool,
    /// Use JSON format (true for production)
    pub json_format: bool,
    pub max_file_size_mb: u64,
    pub max_log_files: u32,
}

/// Cart and pricing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// ISO 4217 code used for new carts when none is given
    pub default_currency: String,
    /// How long a request waits for another request's hold on the same cart
    pub cart_lock_timeout_secs: u64,
    pub session_timeout_mins: i64,
}

/// Seed values for the `points.*` settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyDefaults {
    pub enabled: bool,
    pub earn_type: EarnType,
    pub earn_rate: f64,
    /// Multiplies points straight into minor currency units
    pub redemption_rate: f64,
    pub min_redeem_points: i64,
    /// 0 = unlimited
    pub max_redeem_points: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key).map(|s| s == "true" || s == "1").unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();

        Self {
            environment: env,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Cart Pricing".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            database: DatabaseConfig {
                path: env::var("DB_PATH").unwrap_or_else(|_| "pricing.db".to_string()),
                max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
                min_connections: env_parse("DB_MIN_CONNECTIONS").unwrap_or(2),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if env.is_production() { "warn".to_string() } else { "debug".to_string() }
                }),
                log_to_file: true,
                log_to_stdout: env_flag("LOG_TO_STDOUT", true),
                json_format: env.is_production(),
                max_file_size_mb: 10,
                max_log_files: 5,
            },

            pricing: PricingConfig {
                default_currency: env::var("DEFAULT_CURRENCY")
                    .map(|c| c.to_uppercase())
                    .unwrap_or_else(|_| "MYR".to_string()),
                cart_lock_timeout_secs: env_parse("CART_LOCK_TIMEOUT_SECS").unwrap_or(10),
                session_timeout_mins: env_parse("SESSION_TIMEOUT_MINS").unwrap_or(480), // 8 hours
            },

            loyalty: LoyaltyDefaults {
                enabled: env_flag("POINTS_ENABLED", true),
                earn_type: env::var("POINTS_EARN_TYPE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(EarnType::PerCurrency),
                earn_rate: env_parse("POINTS_EARN_RATE").unwrap_or(1.0),
                redemption_rate: env_parse("POINTS_REDEMPTION_RATE").unwrap_or(0.01),
                min_redeem_points: env_parse("POINTS_MIN_REDEEM").unwrap_or(100),
                max_redeem_points: env_parse("POINTS_MAX_REDEEM").unwrap_or(0),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::default()
    }

    /// Load configuration from a .env file (if exists)
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(path).ok()?;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                env::set_var(key, value);
            }
        }

        Some(Self::default())
    }

    pub fn get_database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database.path)
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Reject configurations the pricing engine cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.pricing.default_currency.len() != 3 {
            return Err("DEFAULT_CURRENCY must be a 3-letter ISO code".to_string());
        }
        if self.loyalty.redemption_rate <= 0.0 || !self.loyalty.redemption_rate.is_finite() {
            return Err("POINTS_REDEMPTION_RATE must be a positive number".to_string());
        }
        if self.loyalty.earn_rate < 0.0 || !self.loyalty.earn_rate.is_finite() {
            return Err("POINTS_EARN_RATE must not be negative".to_string());
        }
        if self.loyalty.min_redeem_points < 0 || self.loyalty.max_redeem_points < 0 {
            return Err("Points redemption bounds must not be negative".to_string());
        }
        Ok(())
    }
}

/// Global configuration instance
static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration
pub fn init_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::load)
}

/// Get the global configuration, loading it from the environment on first use
pub fn get_config() -> &'static AppConfig {
    init_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.default_currency.len(), 3);
    }

    #[test]
    fn test_validate_rejects_zero_redemption_rate() {
        let mut config = AppConfig::default();
        config.loyalty.redemption_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_currency() {
        let mut config = AppConfig::default();
        config.pricing.default_currency = "RINGGIT".into();
        assert!(config.validate().is_err());
    }
}
