use rust_decimal::Decimal;
use thiserror::Error;

/// Failure talking to the venue
///
/// Every variant means "the venue is not usable right now" and drives the
/// connectivity state machine to OFFLINE.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectivityError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed venue payload: {0}")]
    Malformed(String),

    #[error("Venue error {code}: {message}")]
    Api { code: i64, message: String },
}

impl ConnectivityError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ConnectivityError::Auth(_))
    }
}

impl From<reqwest::Error> for ConnectivityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConnectivityError::Timeout(err.to_string())
        } else if err.is_decode() {
            ConnectivityError::Malformed(err.to_string())
        } else {
            ConnectivityError::Transport(err.to_string())
        }
    }
}

/// Order submission outcome from the venue's point of view
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// The venue answered and refused the order
    #[error("Order rejected by venue: {0}")]
    Rejected(String),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),
}

/// Trade-scoped failures: abandon the trade for this pair and cycle, never retry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("Venue offline, orders suspended")]
    Offline,

    #[error("Insufficient balance: {balance:.2} < {required:.2}")]
    InsufficientBalance { balance: f64, required: f64 },

    #[error("Exposure limit exceeded: notional {notional:.2} > limit {limit:.2}")]
    ExposureLimitExceeded { notional: f64, limit: f64 },

    #[error("Bad quote for {pair}: {price}")]
    BadQuote { pair: String, price: f64 },

    #[error("Quantity {quantity} below venue minimum {minimum}")]
    MinimumSizeViolation { quantity: Decimal, minimum: Decimal },

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Connectivity lost: {0}")]
    ConnectivityLost(ConnectivityError),

    #[error("Signal for {pair} was derived from simulated data")]
    SimulatedData { pair: String },

    #[error("Cycle deadline passed before the order for {pair} could start")]
    DeadlineExceeded { pair: String },
}

impl TradeError {
    /// Short stable label used in notifications and logs
    pub fn kind(&self) -> &'static str {
        match self {
            TradeError::Offline => "offline",
            TradeError::InsufficientBalance { .. } => "insufficient_balance",
            TradeError::ExposureLimitExceeded { .. } => "exposure_limit",
            TradeError::BadQuote { .. } => "bad_quote",
            TradeError::MinimumSizeViolation { .. } => "minimum_size",
            TradeError::OrderRejected(_) => "order_rejected",
            TradeError::ConnectivityLost(_) => "connectivity_lost",
            TradeError::SimulatedData { .. } => "simulated_data",
            TradeError::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

/// Process-level errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(String),

    #[error("Data unavailable for {pair}: {reason}")]
    DataUnavailable { pair: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cycle exceeded {0}s timeout")]
    CycleTimeout(u64),

    #[error("Unhandled cycle failure: {0}")]
    UnhandledCycleFailure(String),
}
