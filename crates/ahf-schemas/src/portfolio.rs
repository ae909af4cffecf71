use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical ticker form: trimmed, ASCII upper-case.
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Simulated trading portfolio as held by the backend.
///
/// Ticker keys of `positions` and `realized_gains` are normalized on decode,
/// so `"aapl"` and `"AAPL"` collapse into one entry (last one wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    #[serde(default)]
    pub margin_requirement: f64,
    #[serde(default)]
    pub margin_used: f64,
    #[serde(default, deserialize_with = "de_ticker_map")]
    pub positions: BTreeMap<String, Position>,
    #[serde(default, deserialize_with = "de_ticker_map")]
    pub realized_gains: BTreeMap<String, RealizedGain>,
}

impl Portfolio {
    /// Positions with at least one non-zero side, in ticker order.
    pub fn active_positions(&self) -> impl Iterator<Item = (&String, &Position)> {
        self.positions.iter().filter(|(_, p)| p.is_active())
    }

    pub fn active_tickers(&self) -> Vec<String> {
        self.active_positions().map(|(t, _)| t.clone()).collect()
    }

    pub fn has_active_positions(&self) -> bool {
        self.active_positions().next().is_some()
    }
}

/// Long/short holdings for one ticker.
///
/// A position with `long == 0 && short == 0` stays in the map but is treated
/// as removed everywhere (display, analysis eligibility, price polling).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub long: u64,
    #[serde(default)]
    pub short: u64,
    #[serde(default)]
    pub long_cost_basis: f64,
    #[serde(default)]
    pub short_cost_basis: f64,
    #[serde(default)]
    pub short_margin_used: f64,
}

impl Position {
    pub fn is_active(&self) -> bool {
        self.long > 0 || self.short > 0
    }

    /// Net cost-basis exposure: `long*long_cost_basis - short*short_cost_basis`.
    pub fn cost_basis_value(&self) -> f64 {
        self.long as f64 * self.long_cost_basis - self.short as f64 * self.short_cost_basis
    }

    /// Gross capital committed: `long*long_cost_basis + short*short_cost_basis`.
    pub fn gross_cost_basis(&self) -> f64 {
        self.long as f64 * self.long_cost_basis + self.short as f64 * self.short_cost_basis
    }
}

/// Realized long/short gain totals for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedGain {
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub short: f64,
}

/// Full-replace position record sent to `PUT /portfolio/positions`.
///
/// The backend sets these values absolutely; it never increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub ticker: String,
    #[serde(default)]
    pub long_shares: u64,
    #[serde(default)]
    pub short_shares: u64,
    #[serde(default)]
    pub long_cost_basis: f64,
    #[serde(default)]
    pub short_cost_basis: f64,
}

impl PositionUpdate {
    /// A long-only update.
    pub fn long(ticker: &str, shares: u64, cost_basis: f64) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            long_shares: shares,
            short_shares: 0,
            long_cost_basis: cost_basis,
            short_cost_basis: 0.0,
        }
    }

    /// Removal is expressed as a zeroed full-replace record.
    pub fn zeroed(ticker: &str) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            long_shares: 0,
            short_shares: 0,
            long_cost_basis: 0.0,
            short_cost_basis: 0.0,
        }
    }

    pub fn from_position(ticker: &str, pos: &Position) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            long_shares: pos.long,
            short_shares: pos.short,
            long_cost_basis: pos.long_cost_basis,
            short_cost_basis: pos.short_cost_basis,
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.long_shares == 0 && self.short_shares == 0
    }
}

fn de_ticker_map<'de, D, V>(d: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw: BTreeMap<String, V> = BTreeMap::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (normalize_ticker(&k), v))
        .collect())
}
