//! Request and response bodies of the hedge-fund backend.
//!
//! Field names match the backend's JSON exactly (snake_case).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::portfolio::{Portfolio, PositionUpdate};

// ---------------------------------------------------------------------------
// /portfolio
// ---------------------------------------------------------------------------

/// `GET /portfolio/` answers either with the bare portfolio or with a
/// `{ "portfolio": ... }` wrapper (older backends); both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortfolioResponse {
    Wrapped { portfolio: Portfolio },
    Bare(Portfolio),
}

impl PortfolioResponse {
    pub fn into_portfolio(self) -> Portfolio {
        match self {
            PortfolioResponse::Wrapped { portfolio } => portfolio,
            PortfolioResponse::Bare(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePortfolioRequest {
    pub initial_cash: f64,
    pub margin_requirement: f64,
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePositionsRequest {
    pub positions: Vec<PositionUpdate>,
}

/// Error body of a non-2xx backend response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// ---------------------------------------------------------------------------
// /portfolio/stock-data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDataRequest {
    pub tickers: Vec<String>,
    /// "1d" | "1mo" | "3mo" | "6mo" | "1y"
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockDataResponse {
    #[serde(default)]
    pub stock_data: BTreeMap<String, TickerData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerData {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub chart_data: Vec<ChartBar>,
}

/// Daily bar; only `date` and `close` are consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub date: String,
    pub close: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// /portfolio/holdings-data
// ---------------------------------------------------------------------------

/// Dashboard snapshot: holdings plus a per-ticker market/ratio block.
/// The shape beyond these two keys is backend-defined and kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsResponse {
    #[serde(default)]
    pub holdings: Value,
    #[serde(default)]
    pub market_data: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// /hedge-fund/run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeFundRunRequest {
    pub tickers: Vec<String>,
    pub selected_agents: Vec<String>,
    pub model_name: String,
    pub model_provider: String,
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD
    pub end_date: String,
    pub initial_cash: f64,
    pub margin_requirement: f64,
    pub portfolio: Portfolio,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn portfolio_response_accepts_bare_and_wrapped() {
        let bare: PortfolioResponse =
            serde_json::from_value(json!({ "cash": 5.0, "margin_requirement": 0.5 })).unwrap();
        let wrapped: PortfolioResponse = serde_json::from_value(json!({
            "message": "ok",
            "portfolio": { "cash": 5.0, "margin_requirement": 0.5 }
        }))
        .unwrap();

        assert_eq!(bare.into_portfolio(), wrapped.into_portfolio());
    }

    #[test]
    fn chart_bar_keeps_ohlc_extras() {
        let bar: ChartBar =
            serde_json::from_value(json!({ "date": "2024-01-02", "close": 10.5, "open": 10.0 })).unwrap();
        assert_eq!(bar.close, 10.5);
        assert_eq!(bar.extra["open"], json!(10.0));
    }
}
