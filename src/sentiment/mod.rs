// Market mood collaborator
//
// Only the scalar score matters to the decision loop. When no live source is
// configured the simulated source is used and every reading is tagged so the
// fusion engine can ignore it.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Market mood in [-1, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarketMood {
    pub score: f64,
    /// True when no live source was reachable
    pub simulated: bool,
}

impl MarketMood {
    pub fn live(score: f64) -> Self {
        Self {
            score: score.clamp(-1.0, 1.0),
            simulated: false,
        }
    }

    /// Score to feed into fusion, None for simulated readings
    pub fn usable_score(&self) -> Option<f64> {
        if self.simulated {
            None
        } else {
            Some(self.score)
        }
    }
}

#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn score_market(&self) -> MarketMood;
}

/// Random mood with a mild positive bias during business hours
pub struct SimulatedSentiment {
    rng: Mutex<StdRng>,
}

impl SimulatedSentiment {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn score_at_hour(&self, hour: u32) -> MarketMood {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let score = if (9..=17).contains(&hour) {
            rng.gen_range(-0.02..0.08)
        } else {
            rng.gen_range(-0.05..0.05)
        };

        MarketMood { score, simulated: true }
    }
}

impl Default for SimulatedSentiment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentSource for SimulatedSentiment {
    async fn score_market(&self) -> MarketMood {
        self.score_at_hour(Local::now().hour())
    }
}
