// Venue connectivity, market data and order execution
pub mod connectivity;
pub mod executor;
pub mod market_data;
pub mod reconnect;

pub use connectivity::{
    transition, ConnectivityEvent, ConnectivityManager, ConnectivityState, Mode, ProbeReport,
};
pub use executor::OrderExecutor;
pub use market_data::{LiveMarketData, MarketDataSource, SimulatedMarketData};
pub use reconnect::spawn_reconnect_task;
