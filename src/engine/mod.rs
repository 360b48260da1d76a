// Decision loop orchestration
pub mod cycle;
pub mod events;
pub mod history;
pub mod performance;

pub use cycle::{CycleController, CycleSummary};
pub use events::BotEvent;
pub use history::{Holding, OperationHistory, RealizedTrade};
pub use performance::{PerformanceCounters, PerformanceReport};
