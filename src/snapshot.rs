use serde::Serialize;

use crate::fetch::{MarketData, Reading};

/// Everything one run knows about the market.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub fear_greed: Option<i64>,
    pub alt_season_index: Option<i64>,
    pub total_market_cap: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub eth_dominance: Option<f64>,
    pub stablecoin_ratio: Option<f64>,
}

impl MarketSnapshot {
    pub fn from_readings(fear_greed: Reading<i64>, alt_season: Reading<i64>, market: MarketData) -> Self {
        Self {
            fear_greed: fear_greed.into_option(),
            alt_season_index: alt_season.into_option(),
            total_market_cap: market.total_market_cap.into_option(),
            btc_dominance: market.btc_dominance.into_option(),
            eth_dominance: market.eth_dominance.into_option(),
            stablecoin_ratio: market.stablecoin_ratio.into_option(),
        }
    }

    /// Number of fields that carry a value.
    pub fn present_count(&self) -> usize {
        [
            self.fear_greed.is_some(),
            self.alt_season_index.is_some(),
            self.total_market_cap.is_some(),
            self.btc_dominance.is_some(),
            self.eth_dominance.is_some(),
            self.stablecoin_ratio.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
    }
}
