//! ahf-client
//!
//! Boundary to the hedge-fund backend. [`BackendApi`] is the contract every
//! higher layer is written against; [`HttpBackend`] is the reqwest-backed
//! implementation. Test code substitutes in-memory fakes for the trait.
//!
//! This crate does no retries and holds no state beyond the HTTP client.

mod error;
mod http;

pub use error::ClientError;
pub use http::HttpBackend;

use std::pin::Pin;

use ahf_schemas::{
    CreatePortfolioRequest, HedgeFundRunRequest, HoldingsResponse, Portfolio, PositionUpdate,
    StockDataResponse,
};
use bytes::Bytes;
use futures_util::Stream;

/// Raw body of a streamed analysis run, chunked as it arrives off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Backend REST/SSE surface consumed by the dashboard.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /portfolio/` (bare or wrapped body).
    async fn get_portfolio(&self) -> Result<Portfolio, ClientError>;

    /// `POST /portfolio/create`.
    async fn create_portfolio(&self, req: &CreatePortfolioRequest) -> Result<Portfolio, ClientError>;

    /// `PUT /portfolio/positions` with full-replace records.
    async fn update_positions(&self, positions: &[PositionUpdate]) -> Result<Portfolio, ClientError>;

    /// `POST /portfolio/stock-data`.
    async fn stock_data(&self, tickers: &[String], period: &str)
        -> Result<StockDataResponse, ClientError>;

    /// `GET /portfolio/holdings-data?period=`.
    async fn holdings_data(&self, period: &str) -> Result<HoldingsResponse, ClientError>;

    /// `POST /hedge-fund/run`; resolves once response headers arrive.
    async fn run_hedge_fund(&self, req: &HedgeFundRunRequest) -> Result<ByteStream, ClientError>;
}
