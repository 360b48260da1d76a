// Risk management module
pub mod guard;

pub use guard::{RiskGuard, RiskLimits};
