//! Reference data: the fixed ticker universe and its seed prices.

use std::collections::BTreeMap;

/// The ticker universe the engine trades, with one seed price per ticker.
///
/// Immutable after construction. The seed price is the final fallback for
/// [`best-price queries`](crate::engine::Engine::best_price) on a ticker
/// that has never traded and has no resting limit orders.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    prices: BTreeMap<String, f64>,
}

impl ReferenceData {
    /// Builds a universe from `(ticker, seed_price)` pairs.
    pub fn new<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            prices: seed
                .into_iter()
                .map(|(ticker, price)| (ticker.into(), price))
                .collect(),
        }
    }

    /// The built-in five-ticker universe used by the simulator.
    #[must_use]
    pub fn default_universe() -> Self {
        Self::new([
            ("AAPL", 150.0),
            ("MSFT", 320.0),
            ("GOOG", 135.0),
            ("AMZN", 130.0),
            ("TSLA", 250.0),
        ])
    }

    /// Whether `ticker` belongs to the universe.
    #[must_use]
    pub fn is_valid_ticker(&self, ticker: &str) -> bool {
        self.prices.contains_key(ticker)
    }

    /// The seed price for `ticker`, if it belongs to the universe.
    #[must_use]
    pub fn initial_price(&self, ticker: &str) -> Option<f64> {
        self.prices.get(ticker).copied()
    }

    /// All tickers in the universe, in lexicographic order.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::default_universe()
    }
}
