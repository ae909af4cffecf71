//! ahf-portfolio
//!
//! Presentational math over a [`Portfolio`](ahf_schemas::Portfolio):
//! - per-position and portfolio-level unrealized gains
//! - client-side portfolio summary
//! - daily history series for the chart (market, flat, or mock fallback)
//! - the two-channel result store (analysis runs vs. real-time prices)
//! - validation of portfolio-creation and position-update input
//!
//! Everything except [`history::build_history`] is pure: no IO, no clock.

mod input;
mod metrics;
mod results;

pub mod history;

pub use history::{
    build_history, flat_series, mock_series, series_from_market_data, ChartPeriod, HistorySeries,
    HistorySource, UnknownPeriod,
};
pub use input::{validate_update, CreatePortfolioInput, InputError};
pub use metrics::{holdings, PortfolioSummary, PortfolioTotals, PositionMetrics};
pub use results::{PriceMap, ResultStore};
