use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};
use uuid::Uuid;

use super::connectivity::ConnectivityManager;
use crate::error::{SubmitError, TradeError};
use crate::models::{OrderReceipt, OrderRequest, Side};
use crate::risk::RiskGuard;

/// Validates and submits market orders
///
/// Checks run in a fixed order and the first failure abandons the trade.
/// Nothing is retried: a second submission could double-execute.
#[derive(Debug, Clone, Default)]
pub struct OrderExecutor {
    guard: RiskGuard,
}

impl OrderExecutor {
    pub fn new(guard: RiskGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &RiskGuard {
        &self.guard
    }

    pub async fn execute(
        &self,
        conn: &mut ConnectivityManager,
        pair: &str,
        side: Side,
        notional: f64,
    ) -> Result<OrderReceipt, TradeError> {
        if !conn.is_online() {
            return Err(TradeError::Offline);
        }

        let balance = conn.balance().await.map_err(TradeError::ConnectivityLost)?;
        self.guard.check_balance(balance, notional)?;
        self.guard.check_exposure(balance, notional)?;

        let price = conn.price(pair).await.map_err(TradeError::ConnectivityLost)?;
        self.guard.check_quote(pair, price)?;

        let rules = conn.market_rules(pair).await.map_err(TradeError::ConnectivityLost)?;
        let quantity = self.guard.size(notional, price, &rules)?;

        let request = OrderRequest {
            pair: pair.to_string(),
            side,
            quantity,
            client_order_id: Uuid::new_v4().to_string(),
        };

        info!(
            pair = %pair,
            side = %side,
            quantity = %quantity,
            price,
            notional,
            "Submitting market order"
        );

        let venue_order = conn.submit(&request).await.map_err(|e| match e {
            SubmitError::Rejected(reason) => TradeError::OrderRejected(reason),
            SubmitError::Connectivity(err) => TradeError::ConnectivityLost(err),
        });
        let venue_order = match venue_order {
            Ok(order) => order,
            Err(e) => {
                warn!(pair = %pair, side = %side, error = %e, "Order not placed");
                return Err(e);
            }
        };

        let fill_price = venue_order.fill_price.unwrap_or(price);
        let receipt = OrderReceipt {
            id: venue_order.order_id,
            client_order_id: request.client_order_id,
            pair: pair.to_string(),
            side,
            price: fill_price,
            quantity,
            cost: quantity.to_f64().unwrap_or(0.0) * fill_price,
            timestamp: Utc::now(),
            status: venue_order.status,
        };

        info!(
            pair = %pair,
            order_id = %receipt.id,
            cost = receipt.cost,
            status = %receipt.status,
            "Order placed"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::VenueClient;
    use crate::config::ConnectivityConfig;
    use crate::error::ConnectivityError;
    use crate::models::{Candle, MarketRules, OrderStatus, Timeframe, VenueOrder};
    use crate::risk::RiskLimits;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubVenue {
        balance: f64,
        price: f64,
        reject: bool,
        rules_calls: AtomicUsize,
        orders: AtomicUsize,
    }

    impl StubVenue {
        fn new(balance: f64, price: f64) -> Self {
            Self {
                balance,
                price,
                reject: false,
                rules_calls: AtomicUsize::new(0),
                orders: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VenueClient for StubVenue {
        async fn fetch_candles(&self, _: &str, _: Timeframe, _: usize) -> Result<Vec<Candle>, ConnectivityError> {
            Ok(Vec::new())
        }

        async fn fetch_ticker(&self, _: &str) -> Result<f64, ConnectivityError> {
            Ok(self.price)
        }

        async fn fetch_balance(&self) -> Result<f64, ConnectivityError> {
            Ok(self.balance)
        }

        async fn fetch_market_rules(&self, pair: &str) -> Result<MarketRules, ConnectivityError> {
            self.rules_calls.fetch_add(1, Ordering::SeqCst);
            Ok(MarketRules {
                pair: pair.to_string(),
                qty_step: Decimal::new(1, 4),
                min_qty: Decimal::new(1, 4),
            })
        }

        async fn submit_market_order(&self, _: &OrderRequest) -> Result<VenueOrder, SubmitError> {
            self.orders.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(SubmitError::Rejected("insufficient margin".into()));
            }
            Ok(VenueOrder {
                order_id: "42".into(),
                status: OrderStatus::Filled,
                fill_price: None,
            })
        }

        async fn probe(&self) -> Result<(), ConnectivityError> {
            Ok(())
        }
    }

    fn setup(venue: StubVenue) -> (Arc<StubVenue>, ConnectivityManager, OrderExecutor) {
        let venue = Arc::new(venue);
        let conn = ConnectivityManager::new(venue.clone(), ConnectivityConfig::default());
        let executor = OrderExecutor::new(RiskGuard::new(RiskLimits {
            max_notional_per_trade: 100.0,
            max_fraction_of_balance: 1.0,
            min_confidence: 75.0,
        }));
        (venue, conn, executor)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (venue, mut conn, executor) = setup(StubVenue::new(100.0, 2.0));

        let receipt = executor.execute(&mut conn, "XRP/USDT", Side::Buy, 10.0).await.unwrap();

        assert_eq!(receipt.quantity, Decimal::from(5));
        assert_eq!(receipt.price, 2.0);
        assert_eq!(receipt.cost, 10.0);
        assert_eq!(receipt.status, OrderStatus::Filled);
        assert_eq!(venue.orders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offline_never_submits() {
        let (venue, mut conn, executor) = setup(StubVenue::new(100.0, 2.0));
        conn.apply(
            crate::execution::ConnectivityEvent::CallFailed(ConnectivityError::Timeout("x".into())),
            Utc::now(),
        );

        let err = executor.execute(&mut conn, "XRP/USDT", Side::Buy, 10.0).await.unwrap_err();
        assert_eq!(err, TradeError::Offline);
        assert_eq!(venue.orders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_issues_no_order() {
        let (venue, mut conn, executor) = setup(StubVenue::new(40.0, 2.0));

        let err = executor.execute(&mut conn, "XRP/USDT", Side::Buy, 50.0).await.unwrap_err();
        assert!(matches!(err, TradeError::InsufficientBalance { .. }));
        assert_eq!(venue.orders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_price_is_bad_quote_before_sizing() {
        let (venue, mut conn, executor) = setup(StubVenue::new(100.0, 0.0));

        let err = executor.execute(&mut conn, "XRP/USDT", Side::Sell, 10.0).await.unwrap_err();
        assert!(matches!(err, TradeError::BadQuote { .. }));
        assert_eq!(venue.rules_calls.load(Ordering::SeqCst), 0);
        assert_eq!(venue.orders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let mut stub = StubVenue::new(100.0, 2.0);
        stub.reject = true;
        let (venue, mut conn, executor) = setup(stub);

        let err = executor.execute(&mut conn, "XRP/USDT", Side::Buy, 10.0).await.unwrap_err();
        assert!(matches!(err, TradeError::OrderRejected(_)));
        assert_eq!(venue.orders.load(Ordering::SeqCst), 1);
        // A refusal is not a connectivity problem
        assert!(conn.is_online());
    }

    #[tokio::test]
    async fn test_rules_are_cached() {
        let (venue, mut conn, executor) = setup(StubVenue::new(100.0, 2.0));

        executor.execute(&mut conn, "XRP/USDT", Side::Buy, 10.0).await.unwrap();
        executor.execute(&mut conn, "XRP/USDT", Side::Buy, 10.0).await.unwrap();
        assert_eq!(venue.rules_calls.load(Ordering::SeqCst), 1);
    }
}
