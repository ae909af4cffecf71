use ahf_schemas::{Portfolio, Position};
use serde::Serialize;

use crate::results::PriceMap;

/// Display metrics for one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionMetrics {
    pub ticker: String,
    pub long: u64,
    pub short: u64,
    /// long*long_cost_basis - short*short_cost_basis
    pub position_value: f64,
    pub current_price: Option<f64>,
    /// Relative to `long_cost_basis`. `None` without a price.
    pub price_change: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub unrealized_gain: Option<f64>,
    pub unrealized_gain_percent: Option<f64>,
}

impl PositionMetrics {
    pub fn compute(ticker: &str, pos: &Position, current_price: Option<f64>) -> Self {
        let mut m = Self {
            ticker: ticker.to_string(),
            long: pos.long,
            short: pos.short,
            position_value: pos.cost_basis_value(),
            current_price,
            price_change: None,
            price_change_percent: None,
            unrealized_gain: None,
            unrealized_gain_percent: None,
        };

        let Some(price) = current_price else {
            return m;
        };

        let change = price - pos.long_cost_basis;
        m.price_change = Some(change);
        m.price_change_percent = Some(percent_of(change, pos.long_cost_basis));

        let gain = unrealized_gain(pos, price);
        m.unrealized_gain = Some(gain);
        m.unrealized_gain_percent = Some(percent_of(gain, pos.gross_cost_basis()));
        m
    }
}

/// long side: (price - lcb) * long; short side: (scb - price) * short
fn unrealized_gain(pos: &Position, price: f64) -> f64 {
    let long = if pos.long > 0 {
        (price - pos.long_cost_basis) * pos.long as f64
    } else {
        0.0
    };
    let short = if pos.short > 0 {
        (pos.short_cost_basis - price) * pos.short as f64
    } else {
        0.0
    };
    long + short
}

/// `part / whole * 100`, 0 when `whole` is 0.
fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Metrics for every active position, in ticker order.
pub fn holdings(portfolio: &Portfolio, prices: &PriceMap) -> Vec<PositionMetrics> {
    portfolio
        .active_positions()
        .map(|(t, p)| PositionMetrics::compute(t, p, prices.get(t).copied()))
        .collect()
}

/// Aggregate gains across active positions.
///
/// Only positions with a known price contribute to `unrealized_gain`,
/// `cost_basis`, and the percentage; unpriced positions are counted in
/// `unpriced_positions` and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioTotals {
    /// Σ position_value over all active positions.
    pub position_value: f64,
    pub unrealized_gain: f64,
    pub cost_basis: f64,
    pub unrealized_gain_percent: f64,
    pub priced_positions: usize,
    pub unpriced_positions: usize,
}

impl PortfolioTotals {
    pub fn compute(portfolio: &Portfolio, prices: &PriceMap) -> Self {
        let mut t = Self::default();
        for (ticker, pos) in portfolio.active_positions() {
            t.position_value += pos.cost_basis_value();
            match prices.get(ticker) {
                Some(price) => {
                    t.unrealized_gain += unrealized_gain(pos, *price);
                    t.cost_basis += pos.gross_cost_basis();
                    t.priced_positions += 1;
                }
                None => t.unpriced_positions += 1,
            }
        }
        t.unrealized_gain_percent = percent_of(t.unrealized_gain, t.cost_basis);
        t
    }
}

/// Cost-basis valuation of the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub cash: f64,
    pub total_long_value: f64,
    pub total_short_value: f64,
    /// cash + total_long_value - total_short_value
    pub total_portfolio_value: f64,
    pub positions_count: usize,
    pub margin_used: f64,
    pub margin_requirement: f64,
}

impl PortfolioSummary {
    pub fn compute(portfolio: &Portfolio) -> Self {
        let (long, short) = portfolio.positions.values().fold((0.0, 0.0), |(l, s), p| {
            (
                l + p.long as f64 * p.long_cost_basis,
                s + p.short as f64 * p.short_cost_basis,
            )
        });
        Self {
            cash: portfolio.cash,
            total_long_value: long,
            total_short_value: short,
            total_portfolio_value: portfolio.cash + long - short,
            positions_count: portfolio.active_positions().count(),
            margin_used: portfolio.margin_used,
            margin_requirement: portfolio.margin_requirement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn long(shares: u64, cb: f64) -> Position {
        Position {
            long: shares,
            long_cost_basis: cb,
            ..Position::default()
        }
    }

    fn short(shares: u64, cb: f64) -> Position {
        Position {
            short: shares,
            short_cost_basis: cb,
            ..Position::default()
        }
    }

    fn portfolio(cash: f64, positions: &[(&str, Position)]) -> Portfolio {
        Portfolio {
            cash,
            margin_requirement: 0.5,
            margin_used: 0.0,
            positions: positions
                .iter()
                .map(|(t, p)| (t.to_string(), p.clone()))
                .collect(),
            realized_gains: BTreeMap::new(),
        }
    }

    #[test]
    fn long_position_gain() {
        let m = PositionMetrics::compute("AAPL", &long(10, 150.0), Some(165.0));
        assert_eq!(m.position_value, 1500.0);
        assert_eq!(m.price_change, Some(15.0));
        assert_eq!(m.price_change_percent, Some(10.0));
        assert_eq!(m.unrealized_gain, Some(150.0));
        assert_eq!(m.unrealized_gain_percent, Some(10.0));
    }

    #[test]
    fn short_position_gains_when_price_falls() {
        let m = PositionMetrics::compute("TSLA", &short(4, 200.0), Some(150.0));
        assert_eq!(m.position_value, -800.0);
        assert_eq!(m.unrealized_gain, Some(200.0));
        assert_eq!(m.unrealized_gain_percent, Some(25.0));
        // no long basis to compare against
        assert_eq!(m.price_change_percent, Some(0.0));
    }

    #[test]
    fn no_price_means_no_gain_figures() {
        let m = PositionMetrics::compute("AAPL", &long(10, 150.0), None);
        assert_eq!(m.position_value, 1500.0);
        assert!(m.unrealized_gain.is_none());
        assert!(m.price_change.is_none());
    }

    #[test]
    fn zero_cost_basis_percent_is_zero() {
        let m = PositionMetrics::compute("FREE", &long(10, 0.0), Some(5.0));
        assert_eq!(m.unrealized_gain, Some(50.0));
        assert_eq!(m.unrealized_gain_percent, Some(0.0));
    }

    #[test]
    fn totals_exclude_unpriced_positions() {
        let p = portfolio(
            1_000.0,
            &[
                ("AAPL", long(10, 100.0)),
                ("MSFT", long(10, 300.0)),
                ("GONE", Position::default()),
            ],
        );
        let prices: PriceMap = [("AAPL".to_string(), 110.0)].into_iter().collect();

        let t = PortfolioTotals::compute(&p, &prices);
        assert_eq!(t.unrealized_gain, 100.0);
        assert_eq!(t.cost_basis, 1_000.0);
        assert_eq!(t.unrealized_gain_percent, 10.0, "MSFT must not dilute the percentage");
        assert_eq!(t.position_value, 4_000.0);
        assert_eq!((t.priced_positions, t.unpriced_positions), (1, 1));
    }

    #[test]
    fn holdings_skip_inactive() {
        let p = portfolio(0.0, &[("AAPL", long(1, 1.0)), ("GONE", Position::default())]);
        let h = holdings(&p, &PriceMap::new());
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].ticker, "AAPL");
    }

    #[test]
    fn summary_matches_backend_formula() {
        let p = portfolio(
            10_000.0,
            &[("AAPL", long(10, 150.0)), ("TSLA", short(2, 250.0)), ("GONE", Position::default())],
        );
        let s = PortfolioSummary::compute(&p);
        assert_eq!(s.total_long_value, 1_500.0);
        assert_eq!(s.total_short_value, 500.0);
        assert_eq!(s.total_portfolio_value, 11_000.0);
        assert_eq!(s.positions_count, 2);
    }
}
