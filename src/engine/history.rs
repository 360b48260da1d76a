use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::{OrderReceipt, Side};

/// Quantity bought by the bot and not yet sold, per pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub quantity: f64,
    pub cost_basis: f64,
}

impl Holding {
    pub fn average_price(&self) -> Option<f64> {
        if self.quantity > 0.0 {
            Some(self.cost_basis / self.quantity)
        } else {
            None
        }
    }
}

/// Result of pairing a sell against earlier buys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedTrade {
    pub pair: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
}

impl RealizedTrade {
    pub fn is_win(&self) -> bool {
        self.exit_price > self.entry_price
    }
}

/// Append-only log of placed orders
///
/// Sells are matched against bought quantity at average cost. Selling more
/// than the bot bought only realizes the matched part.
#[derive(Debug, Default)]
pub struct OperationHistory {
    receipts: Vec<OrderReceipt>,
    holdings: HashMap<String, Holding>,
    realized: Vec<RealizedTrade>,
}

impl OperationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, receipt: OrderReceipt) -> Option<RealizedTrade> {
        let quantity = receipt.quantity.to_f64().unwrap_or(0.0);
        let holding = self.holdings.entry(receipt.pair.clone()).or_default();

        let realized = match receipt.side {
            Side::Buy => {
                holding.quantity += quantity;
                holding.cost_basis += quantity * receipt.price;
                None
            }
            Side::Sell => match holding.average_price() {
                Some(entry_price) => {
                    let matched = quantity.min(holding.quantity);
                    holding.cost_basis -= matched * entry_price;
                    holding.quantity -= matched;
                    if holding.quantity <= f64::EPSILON {
                        *holding = Holding::default();
                    }

                    let trade = RealizedTrade {
                        pair: receipt.pair.clone(),
                        quantity: matched,
                        entry_price,
                        exit_price: receipt.price,
                        pnl: (receipt.price - entry_price) * matched,
                    };
                    tracing::info!(
                        pair = %trade.pair,
                        pnl = trade.pnl,
                        win = trade.is_win(),
                        "Realized trade"
                    );
                    Some(trade)
                }
                None => None,
            },
        };

        if let Some(trade) = &realized {
            self.realized.push(trade.clone());
        }
        self.receipts.push(receipt);
        realized
    }

    pub fn receipts(&self) -> &[OrderReceipt] {
        &self.receipts
    }

    pub fn realized(&self) -> &[RealizedTrade] {
        &self.realized
    }

    pub fn holding(&self, pair: &str) -> Option<&Holding> {
        self.holdings.get(pair)
    }

    pub fn realized_wins(&self) -> usize {
        self.realized.iter().filter(|t| t.is_win()).count()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized.iter().map(|t| t.pnl).sum()
    }
}
