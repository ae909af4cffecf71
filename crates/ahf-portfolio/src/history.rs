//! Daily portfolio-value series for the chart.
//!
//! Three sources, distinguishable through [`HistorySource`]:
//! - `Flat`: no active positions, every point is the cash balance.
//! - `Market`: historical closes from the backend.
//! - `Mock`: the backend call failed; a randomized plausible series stands
//!   in so the chart still renders. Only its bounds are guaranteed.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use ahf_client::BackendApi;
use ahf_schemas::{Portfolio, PortfolioChartPoint, StockDataResponse};
use chrono::{Days, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[default]
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chart period {0:?} (expected 1mo, 3mo, 6mo or 1y)")]
pub struct UnknownPeriod(pub String);

impl ChartPeriod {
    pub const ALL: [ChartPeriod; 4] = [
        ChartPeriod::OneMonth,
        ChartPeriod::ThreeMonths,
        ChartPeriod::SixMonths,
        ChartPeriod::OneYear,
    ];

    pub fn days(self) -> u64 {
        match self {
            ChartPeriod::OneMonth => 30,
            ChartPeriod::ThreeMonths => 90,
            ChartPeriod::SixMonths => 180,
            ChartPeriod::OneYear => 365,
        }
    }

    /// Value of the `period` field sent to `/portfolio/stock-data`.
    pub fn as_api_str(self) -> &'static str {
        match self {
            ChartPeriod::OneMonth => "1mo",
            ChartPeriod::ThreeMonths => "3mo",
            ChartPeriod::SixMonths => "6mo",
            ChartPeriod::OneYear => "1y",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownPeriod> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_api_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}

impl FromStr for ChartPeriod {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Flat,
    Market,
    Mock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    pub source: HistorySource,
    pub period: ChartPeriod,
    pub points: Vec<PortfolioChartPoint>,
}

fn point(date: NaiveDate, cash: f64, positions_value: f64, unrealized: f64) -> PortfolioChartPoint {
    PortfolioChartPoint {
        date,
        timestamp: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
        total_value: cash + positions_value,
        cash,
        positions_value,
        unrealized_gains: unrealized,
    }
}

/// `days + 1` dates ending at `today`, oldest first.
fn window(period: ChartPeriod, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = period.days();
    (0..=days).filter_map(move |i| today.checked_sub_days(Days::new(days - i)))
}

/// One point per day in the window, all at `cash`.
pub fn flat_series(cash: f64, period: ChartPeriod, today: NaiveDate) -> Vec<PortfolioChartPoint> {
    window(period, today)
        .map(|d| point(d, cash, 0.0, 0.0))
        .collect()
}

// Accepts "2024-01-02" and anything starting with it ("2024-01-02T00:00:00").
fn bar_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Value the active positions over every date any of their tickers has a
/// close for.
///
/// A ticker without a close on some date is valued at its cost basis that
/// day, so gaps never break the series. Empty when no bar is usable.
pub fn series_from_market_data(
    portfolio: &Portfolio,
    data: &StockDataResponse,
) -> Vec<PortfolioChartPoint> {
    let mut closes: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    let mut dates = BTreeSet::new();

    for (ticker, _) in portfolio.active_positions() {
        let Some(td) = data.stock_data.get(ticker) else {
            continue;
        };
        let by_date = closes.entry(ticker.as_str()).or_default();
        for bar in &td.chart_data {
            match bar_date(&bar.date) {
                Some(d) => {
                    by_date.insert(d, bar.close);
                    dates.insert(d);
                }
                None => debug!(ticker = %ticker, date = %bar.date, "unparseable bar date skipped"),
            }
        }
    }

    let cost_basis: f64 = portfolio
        .active_positions()
        .map(|(_, p)| p.cost_basis_value())
        .sum();

    dates
        .into_iter()
        .map(|d| {
            let positions_value: f64 = portfolio
                .active_positions()
                .map(|(t, p)| {
                    match closes.get(t.as_str()).and_then(|m| m.get(&d)) {
                        Some(close) => (p.long as f64 - p.short as f64) * close,
                        None => p.cost_basis_value(),
                    }
                })
                .sum();
            point(d, portfolio.cash, positions_value, positions_value - cost_basis)
        })
        .collect()
}

/// Sinusoidal trend plus bounded noise around `cash + positions_value`.
///
/// Amplitude is 5% of `|positions_value|`, noise at most 2%. Total value is
/// clamped to `>= cash`.
pub fn mock_series<R: Rng>(
    cash: f64,
    positions_value: f64,
    period: ChartPeriod,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<PortfolioChartPoint> {
    let days = period.days() as f64;
    let amplitude = positions_value.abs() * 0.05;
    let noise = positions_value.abs() * 0.02;

    window(period, today)
        .enumerate()
        .map(|(i, d)| {
            let trend = amplitude * (i as f64 / days * TAU).sin();
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..=noise)
            } else {
                0.0
            };
            let total = (cash + positions_value + trend + jitter).max(cash);
            let pv = total - cash;
            point(d, cash, pv, pv - positions_value)
        })
        .collect()
}

/// Build the chart series for `portfolio` over `period` ending at `today`.
///
/// Never fails: a backend error (or a response with no usable bars) falls
/// back to [`mock_series`].
pub async fn build_history<B>(
    backend: &B,
    portfolio: &Portfolio,
    period: ChartPeriod,
    today: NaiveDate,
) -> HistorySeries
where
    B: BackendApi + ?Sized,
{
    let tickers = portfolio.active_tickers();
    if tickers.is_empty() {
        return HistorySeries {
            source: HistorySource::Flat,
            period,
            points: flat_series(portfolio.cash, period, today),
        };
    }

    match backend.stock_data(&tickers, period.as_api_str()).await {
        Ok(data) => {
            let points = series_from_market_data(portfolio, &data);
            if !points.is_empty() {
                return HistorySeries {
                    source: HistorySource::Market,
                    period,
                    points,
                };
            }
            warn!(period = %period, "stock data had no usable bars; using mock history");
        }
        Err(e) => warn!(period = %period, error = %e, "stock data fetch failed; using mock history"),
    }

    let positions_value: f64 = portfolio
        .active_positions()
        .map(|(_, p)| p.cost_basis_value())
        .sum();
    let mut rng = StdRng::from_entropy();
    HistorySeries {
        source: HistorySource::Mock,
        period,
        points: mock_series(portfolio.cash, positions_value, period, today, &mut rng),
    }
}
