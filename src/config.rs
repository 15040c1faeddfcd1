//! Trading configuration loading, environment interpolation, and validation
//! (§6A).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::use_cases::trader::{finalize_trading_config, TraderConfig, TraderError};
use crate::domain::shared::{Money, Symbol};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Startup validation/derivation failed; the process should terminate.
    #[error("configuration fatal: {0}")]
    Fatal(String),
}

impl From<TraderError> for ConfigError {
    fn from(err: TraderError) -> Self {
        Self::Fatal(err.to_string())
    }
}

/// Top-level recognized trading configuration (§6, §6A).
///
/// Unrecognized keys are rejected at load rather than silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingConfig {
    /// Traded symbols (bare tickers, e.g. `"BTC"`).
    pub assets: Vec<String>,
    /// Base (fiat) currency, e.g. `"USD"`.
    pub base_currency: String,
    /// Starting/current budget.
    pub budget: f64,
    /// Fixed fiat amount invested per buy.
    #[serde(default)]
    pub amount_invest_fiat: Option<f64>,
    /// Fraction of budget invested per buy, if using relative sizing.
    #[serde(default)]
    pub amount_invest_relative: Option<f64>,
    /// Whether to derive `asset_buy_limit` from budget / invest size.
    #[serde(default)]
    pub buy_limit_strategy: bool,
    /// Maximum concurrent open positions.
    #[serde(default)]
    pub asset_buy_limit: Option<usize>,
    /// Candle interval, e.g. `"5min"`.
    pub candle_interval: String,
    /// Exchange identifier, e.g. `"bitfinex"`.
    pub exchange: String,
    /// How far back to backfill history on startup, e.g. `"30d"`.
    pub history_timeframe: String,
    /// Whether a persistent backend mirror is in use.
    #[serde(default)]
    pub use_backend: bool,
    /// Whether orders are actually submitted to the exchange.
    #[serde(default = "default_true")]
    pub run_exchange_api: bool,
    /// Whether this run is a simulation (skips live `trader.update()`).
    #[serde(default)]
    pub is_simulation: bool,
    /// Maker fee percentage (applied to sells).
    pub maker_fee: f64,
    /// Taker fee percentage (applied to buys).
    pub taker_fee: f64,
    /// Maximum hold duration (seconds) before a hold-time sell triggers.
    pub hold_time_limit: f64,
    /// Profit ratio above which a sell triggers early.
    pub profit_ratio_limit: f64,
    /// Multiplier applied to the buy price to derive the sell target.
    pub profit_factor_target: f64,
}

fn default_true() -> bool {
    true
}

impl TradingConfig {
    /// Project the subset of fields the trader use case needs into a
    /// [`TraderConfig`], then run [`finalize_trading_config`] over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Fatal`] when neither `amount_invest_fiat` nor
    /// `amount_invest_relative` is set.
    pub fn into_trader_config(self) -> Result<TraderConfig, ConfigError> {
        let mut trader_config = TraderConfig {
            base_currency: Symbol::new(self.base_currency),
            budget: Money::usd(self.budget),
            amount_invest_fiat: self.amount_invest_fiat.map(Money::usd),
            amount_invest_relative: self.amount_invest_relative,
            buy_limit_strategy: self.buy_limit_strategy,
            asset_buy_limit: self.asset_buy_limit,
            maker_fee_pct: self.maker_fee,
            taker_fee_pct: self.taker_fee,
            profit_factor_target: self.profit_factor_target,
        };
        finalize_trading_config(&mut trader_config)?;
        Ok(trader_config)
    }
}

/// Load trading configuration from a YAML file, applying `${VAR}` /
/// `${VAR:-default}` environment-variable interpolation before parsing.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed.
pub fn load_config(path: Option<&std::path::Path>) -> Result<TradingConfig, ConfigError> {
    let path = path.unwrap_or_else(|| std::path::Path::new("config.yaml"));

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    load_config_from_str(&contents)
}

/// Load trading configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the YAML cannot be parsed.
pub fn load_config_from_str(yaml: &str) -> Result<TradingConfig, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: TradingConfig = serde_yaml::from_str(&interpolated)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. A missing variable
/// with no default becomes an empty string.
fn interpolate_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("valid interpolation regex");

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        let default_value = caps.get(2).map(|m| m.as_str());
        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.unwrap_or_default().to_string(),
        }
    })
    .into_owned()
}
