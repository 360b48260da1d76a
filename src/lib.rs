// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod features;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod sentiment;
pub mod strategy;

// Re-export commonly used types
pub use error::{BotError, ConnectivityError, SubmitError, TradeError};
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, BotError>;
