// src/config.rs

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::core::LedgerConfig;
use crate::error::{CondorError, CondorResult};
use crate::indicators::IndicatorConfig;
use crate::strategies::{ScoringConfig, SelectorConfig};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    pub underlying: String,
    /// Risk-free rate used where a feed omits one.
    pub rate: f64,
    /// Expiry to trade: the listed expiry closest to this many days.
    pub target_dte: u32,
    pub contracts: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            underlying: "SPY".to_string(),
            rate: 0.045,
            target_dte: 35,
            contracts: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedsConfig {
    pub history_path: PathBuf,
    pub chain_path: PathBuf,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("data/history.json"),
            chain_path: PathBuf::from("data/chain.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset.
    pub level: String,
    /// Directory for a daily-rotated log file. Stdout only when unset.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "condor-desk.log".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub indicators: IndicatorConfig,
    pub scoring: ScoringConfig,
    pub selector: SelectorConfig,
    pub ledger: LedgerConfig,
    pub market: MarketConfig,
    pub feeds: FeedsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// `Settings.{toml,yaml,json}` in the working directory if present, then
    /// `APP_*` environment variables (`APP_LEDGER__STARTING_CASH=25000`).
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("Settings").required(false))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::load(File::from(path.into()))
    }

    fn load<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let builder = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> CondorResult<()> {
        self.indicators.validate()?;
        self.scoring.validate()?;
        self.selector.validate()?;
        self.ledger.validate()?;

        let market = &self.market;
        if market.underlying.trim().is_empty() {
            return Err(CondorError::invalid_input("market.underlying is empty"));
        }
        if !market.rate.is_finite() || market.rate < 0.0 {
            return Err(CondorError::invalid_input(format!(
                "market.rate must be >= 0, got {}",
                market.rate
            )));
        }
        if market.contracts < 1 {
            return Err(CondorError::invalid_input("market.contracts must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn settings(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.starting_cash, dec!(10000));
        assert_eq!(config.selector.targets, vec![0.16, 0.20, 0.30]);
    }

    #[test]
    fn file_overrides_selected_fields() {
        let file = settings(
            r#"
            [indicators]
            band_window = 30

            [ledger]
            starting_cash = 25000

            [ledger.exits]
            time_exit_dte = 14

            [selector]
            targets = [0.10, 0.25]

            [market]
            underlying = "QQQ"
            "#,
        );
        let config = AppConfig::from_file(file.path()).unwrap();

        assert_eq!(config.indicators.band_window, 30);
        assert_eq!(config.indicators.oscillator_window, 14);
        assert_eq!(config.ledger.starting_cash, dec!(25000));
        assert_eq!(config.ledger.exits.time_exit_dte, 14);
        assert_eq!(config.ledger.exits.profit_target_pct, dec!(50));
        assert_eq!(config.selector.targets, vec![0.10, 0.25]);
        assert_eq!(config.market.underlying, "QQQ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_nested_fields() {
        std::env::set_var("APP_LEDGER__STARTING_CASH", "25000");
        std::env::set_var("APP_MARKET__UNDERLYING", "IWM");
        let config = AppConfig::new();
        std::env::remove_var("APP_LEDGER__STARTING_CASH");
        std::env::remove_var("APP_MARKET__UNDERLYING");

        let config = config.unwrap();
        assert_eq!(config.ledger.starting_cash, dec!(25000));
        assert_eq!(config.market.underlying, "IWM");
    }

    #[test]
    fn validation_catches_bad_sections() {
        let mut config = AppConfig::default();
        config.indicators.trend_fast_window = 30;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.selector.targets = vec![0.2, 1.5];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.market.contracts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.market.rate = -0.01;
        assert!(config.validate().is_err());
    }
}
