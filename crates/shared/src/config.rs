//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
///
/// Every section has defaults, so an empty configuration is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Settlement matcher configuration.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Partial-payment configuration.
    #[serde(default)]
    pub payments: PaymentConfig,
    /// Idempotency record retention.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settlement matcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Strategy used by auto-settlement: `fifo`, `lifo`, `best_rate` or `manual`.
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    /// How many times a settlement is re-read and retried after a version conflict.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Decimal places kept on realized profit.
    #[serde(default = "default_profit_decimal_places")]
    pub profit_decimal_places: u32,
}

fn default_strategy() -> String {
    "fifo".to_string()
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_profit_decimal_places() -> u32 {
    4
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            max_conflict_retries: default_max_conflict_retries(),
            profit_decimal_places: default_profit_decimal_places(),
        }
    }
}

/// Partial-payment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Share of the total that may stay unpaid while still counting as fully paid.
    #[serde(default = "default_tolerance_ratio")]
    pub fully_paid_tolerance_ratio: Decimal,
    /// Absolute floor of the fully-paid tolerance band.
    #[serde(default = "default_tolerance_floor")]
    pub fully_paid_tolerance_floor: Decimal,
}

fn default_tolerance_ratio() -> Decimal {
    Decimal::new(1, 2) // 1%
}

fn default_tolerance_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            fully_paid_tolerance_ratio: default_tolerance_ratio(),
            fully_paid_tolerance_floor: default_tolerance_floor(),
        }
    }
}

/// Idempotency record retention.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencyConfig {
    /// Seconds a stored response remains replayable.
    #[serde(default = "default_idempotency_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of records kept in memory.
    #[serde(default = "default_idempotency_capacity")]
    pub max_capacity: u64,
}

fn default_idempotency_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_idempotency_capacity() -> u64 {
    100_000
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_idempotency_ttl(),
            max_capacity: default_idempotency_capacity(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "sarraf=info,settler=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layers, later wins: `config/default`, `config/{RUN_MODE}`, `SARRAF__*` env vars.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SARRAF").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
