// Application configuration: defaults -> TOML file -> AUTOTRADER__* environment
//
// Built once at startup and handed to each component by reference.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::features::FeatureConfig;
use crate::models::Timeframe;
use crate::risk::RiskLimits;
use crate::strategy::{StrategyConfig, FALLBACK_CONFIDENCE};
use crate::Result;

pub const DEFAULT_CONFIG_PATH: &str = "autotrader.toml";
const ENV_PREFIX: &str = "AUTOTRADER";
const BYBIT_MAINNET: &str = "https://api.bybit.com";
const BYBIT_MAINNET_ALT: &str = "https://api.bytick.com";
const BYBIT_TESTNET: &str = "https://api-testnet.bybit.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub venue: VenueConfig,
    pub trading: TradingConfig,
    pub risk: RiskLimits,
    pub connectivity: ConnectivityConfig,
    pub strategy: StrategyConfig,
    pub features: FeatureConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    /// Overrides the testnet/mainnet endpoint when set
    pub base_url: Option<String>,
    pub testnet: bool,
    /// Alternate endpoints tried when the active one stops answering
    pub fallback_urls: Vec<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub request_timeout_secs: u64,
    pub rate_limit_per_sec: u32,
    pub recv_window_ms: u64,
    pub account_type: String,
    pub quote_coin: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            testnet: true,
            fallback_urls: Vec::new(),
            api_key: None,
            api_secret: None,
            request_timeout_secs: 10,
            rate_limit_per_sec: 10,
            recv_window_ms: 5000,
            account_type: "UNIFIED".to_string(),
            quote_coin: "USDT".to_string(),
        }
    }
}

impl VenueConfig {
    pub fn endpoint(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.testnet => BYBIT_TESTNET.to_string(),
            None => BYBIT_MAINNET.to_string(),
        }
    }

    /// Primary endpoint first, then the alternates without duplicates
    ///
    /// Mainnet without a `base_url` override also gets the bytick mirror.
    pub fn endpoints(&self) -> Vec<String> {
        let mut urls = vec![self.endpoint()];
        if self.base_url.is_none() && !self.testnet {
            urls.push(BYBIT_MAINNET_ALT.to_string());
        }
        for url in &self.fallback_urls {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() && !urls.iter().any(|known| known == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }

    pub fn has_credentials(&self) -> bool {
        matches!((&self.api_key, &self.api_secret), (Some(k), Some(s)) if !k.is_empty() && !s.is_empty())
    }
}

// Credentials never end up in logs
impl fmt::Debug for VenueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueConfig")
            .field("endpoints", &self.endpoints())
            .field("testnet", &self.testnet)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rate_limit_per_sec", &self.rate_limit_per_sec)
            .field("account_type", &self.account_type)
            .field("quote_coin", &self.quote_coin)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub pairs: Vec<String>,
    pub timeframe: Timeframe,
    /// Bars fetched per pair and cycle
    pub candle_limit: usize,
    pub interval_secs: u64,
    /// Quote-currency amount committed per trade
    pub notional_per_trade: f64,
    pub inter_order_delay_ms: u64,
    pub report_every_cycles: u64,
    /// Produce signals but never submit orders
    pub dry_run: bool,
    pub cycle_timeout_secs: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pairs: vec![
                "XRP/USDT".to_string(),
                "ADA/USDT".to_string(),
                "MATIC/USDT".to_string(),
                "DOGE/USDT".to_string(),
                "SHIB/USDT".to_string(),
            ],
            timeframe: Timeframe::M15,
            candle_limit: 50,
            interval_secs: 120,
            notional_per_trade: 10.0,
            inter_order_delay_ms: 2000,
            report_every_cycles: 10,
            dry_run: false,
            cycle_timeout_secs: 90,
        }
    }
}

impl TradingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn inter_order_delay(&self) -> Duration {
        Duration::from_millis(self.inter_order_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Minimum spacing between reconnection probes while offline
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
    /// Upper bound for any single venue call
    pub call_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 300,
            probe_timeout_secs: 30,
            call_timeout_secs: 15,
        }
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive, used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "autotrader=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// `BYBIT_API_KEY` / `BYBIT_API_SECRET` fill in missing credentials.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("trading.pairs")
                    .with_list_parse_key("venue.fallback_urls")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;

        if config.venue.api_key.is_none() {
            config.venue.api_key = std::env::var("BYBIT_API_KEY").ok();
        }
        if config.venue.api_secret.is_none() {
            config.venue.api_secret = std::env::var("BYBIT_API_SECRET").ok();
        }

        Ok(config)
    }

    /// Reject configurations the bot cannot run safely with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BotError::InvalidConfig(msg));

        if self.trading.pairs.is_empty() {
            return invalid("trading.pairs must not be empty".into());
        }
        if let Some(pair) = self.trading.pairs.iter().find(|p| !p.contains('/')) {
            return invalid(format!("pair '{}' must be written as BASE/QUOTE", pair));
        }
        if !(self.trading.notional_per_trade > 0.0) {
            return invalid("trading.notional_per_trade must be positive".into());
        }
        if self.trading.interval_secs == 0 || self.trading.cycle_timeout_secs == 0 {
            return invalid("trading intervals must be non-zero".into());
        }
        if self.trading.report_every_cycles == 0 {
            return invalid("trading.report_every_cycles must be non-zero".into());
        }
        if self.connectivity.probe_interval_secs == 0
            || self.connectivity.probe_timeout_secs == 0
            || self.connectivity.call_timeout_secs == 0
        {
            return invalid("connectivity intervals must be non-zero".into());
        }
        if self.venue.rate_limit_per_sec == 0 || self.venue.request_timeout_secs == 0 {
            return invalid("venue rate limit and timeout must be non-zero".into());
        }

        let risk = &self.risk;
        if !(risk.max_fraction_of_balance > 0.0 && risk.max_fraction_of_balance <= 1.0) {
            return invalid("risk.max_fraction_of_balance must be in (0, 1]".into());
        }
        if !(risk.max_notional_per_trade > 0.0) {
            return invalid("risk.max_notional_per_trade must be positive".into());
        }
        if !(0.0..=100.0).contains(&risk.min_confidence) {
            return invalid("risk.min_confidence must be in [0, 100]".into());
        }

        let fusion = &self.strategy.fusion;
        if fusion.confidence_floor > fusion.confidence_ceiling {
            return invalid("strategy.fusion confidence floor exceeds ceiling".into());
        }
        if !(fusion.confidence_floor..=fusion.confidence_ceiling).contains(&FALLBACK_CONFIDENCE) {
            return invalid(format!(
                "strategy.fusion confidence range must contain {}",
                FALLBACK_CONFIDENCE
            ));
        }
        if !(0.0..=1.0).contains(&fusion.opposite_share) {
            return invalid("strategy.fusion.opposite_share must be in [0, 1]".into());
        }

        let lookback = self.features.longest_lookback();
        if self.trading.candle_limit < lookback {
            return invalid(format!(
                "trading.candle_limit {} is shorter than the longest indicator lookback {}",
                self.trading.candle_limit, lookback
            ));
        }

        Ok(())
    }

    /// Credentials are only required when orders can be sent
    pub fn require_credentials(&self) -> Result<()> {
        if self.trading.dry_run {
            return Ok(());
        }
        match (&self.venue.api_key, &self.venue.api_secret) {
            (Some(k), _) if k.is_empty() => Err(BotError::MissingCredentials("BYBIT_API_KEY".into())),
            (None, _) => Err(BotError::MissingCredentials("BYBIT_API_KEY".into())),
            (_, Some(s)) if s.is_empty() => Err(BotError::MissingCredentials("BYBIT_API_SECRET".into())),
            (_, None) => Err(BotError::MissingCredentials("BYBIT_API_SECRET".into())),
            _ => Ok(()),
        }
    }
}
