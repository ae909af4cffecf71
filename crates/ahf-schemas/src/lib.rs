//! ahf-schemas
//!
//! Data model shared by every ahf crate: the portfolio entity, analysis
//! results, chart points and the request/response bodies of the hedge-fund
//! backend. Types here are plain serde structs; no I/O and no business logic
//! beyond small accessors.

mod analysis;
mod chart;
mod portfolio;
mod wire;

pub use analysis::{
    AnalysisResult, AnalysisStatus, AnalystSignal, DetailedAnalysis, Reasoning, Signal,
    StrategySignal, TradeAction, TradingDecision, REAL_TIME_SWARM,
};
pub use chart::PortfolioChartPoint;
pub use portfolio::{normalize_ticker, Portfolio, Position, PositionUpdate, RealizedGain};
pub use wire::{
    ChartBar, CreatePortfolioRequest, ErrorBody, HedgeFundRunRequest, HoldingsResponse,
    PortfolioResponse, StockDataRequest, StockDataResponse, TickerData, UpdatePositionsRequest,
};
