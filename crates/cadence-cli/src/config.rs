use cadence_core::recurrence::{MaterializationConfig, DEFAULT_HORIZON_MONTHS};
use figment::{Figment, providers::{Format, Serialized, Toml, Env}};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_PATH: &str = "cadence.db";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: String,
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
}

/// Recurrence settings read from `[recurrence]`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RecurrenceConfig {
    /// Rows per materialization insert
    pub max_batch_size: usize,
    /// How far past a window unbounded templates are projected, in months
    pub horizon_months: u32,
    /// Calendar and preview window when `--to` is omitted
    pub default_window_days: u32,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            horizon_months: DEFAULT_HORIZON_MONTHS,
            default_window_days: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            recurrence: RecurrenceConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Defaults, then `cadence.toml`, then `CADENCE_*` variables
    /// (`CADENCE_RECURRENCE__HORIZON_MONTHS` for nested keys).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_").split("__"))
    }

    pub fn materialization(&self) -> MaterializationConfig {
        MaterializationConfig {
            max_batch_size: self.recurrence.max_batch_size,
            horizon_months: self.recurrence.horizon_months,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Config {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config, Config::default());
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
        assert_eq!(config.materialization().max_batch_size, 100);
    }

    #[test]
    fn test_partial_recurrence_table() {
        let config = from_toml(
            r#"
            database_path = "ledger.db"

            [recurrence]
            horizon_months = 12
            "#,
        );
        assert_eq!(config.database_path, "ledger.db");
        assert_eq!(config.recurrence.horizon_months, 12);
        assert_eq!(config.recurrence.max_batch_size, 100);
        assert_eq!(config.recurrence.default_window_days, 30);
        assert_eq!(config.materialization().horizon_months, 12);
    }
}
