use ahf_config::ApiConfig;
use ahf_schemas::{
    CreatePortfolioRequest, HedgeFundRunRequest, HoldingsResponse, Portfolio, PortfolioResponse,
    PositionUpdate, StockDataRequest, StockDataResponse, UpdatePositionsRequest,
};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{BackendApi, ByteStream, ClientError};

/// reqwest-backed [`BackendApi`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    api: ApiConfig,
}

impl HttpBackend {
    pub fn new(api: ApiConfig) -> Self {
        Self::with_client(api, reqwest::Client::new())
    }

    pub fn with_client(api: ApiConfig, http: reqwest::Client) -> Self {
        Self { http, api }
    }

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    async fn send(&self, rb: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let resp = rb.send().await.map_err(ClientError::transport)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.bytes().await.map_err(ClientError::transport)?;
        Err(ClientError::from_error_body(status.as_u16(), &body))
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        rb: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        let resp = self.send(rb).await?;
        let body = resp.bytes().await.map_err(ClientError::transport)?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(format!("{what}: {e}")))
    }
}

#[async_trait::async_trait]
impl BackendApi for HttpBackend {
    async fn get_portfolio(&self) -> Result<Portfolio, ClientError> {
        let rb = self.http.get(self.api.url("/portfolio/"));
        let body: PortfolioResponse = self.decode(rb, "portfolio").await?;
        Ok(body.into_portfolio())
    }

    async fn create_portfolio(&self, req: &CreatePortfolioRequest) -> Result<Portfolio, ClientError> {
        let rb = self.http.post(self.api.url("/portfolio/create")).json(req);
        let body: PortfolioResponse = self.decode(rb, "create portfolio").await?;
        Ok(body.into_portfolio())
    }

    async fn update_positions(&self, positions: &[PositionUpdate]) -> Result<Portfolio, ClientError> {
        let req = UpdatePositionsRequest {
            positions: positions.to_vec(),
        };
        let rb = self.http.put(self.api.url("/portfolio/positions")).json(&req);
        let body: PortfolioResponse = self.decode(rb, "update positions").await?;
        Ok(body.into_portfolio())
    }

    async fn stock_data(
        &self,
        tickers: &[String],
        period: &str,
    ) -> Result<StockDataResponse, ClientError> {
        let req = StockDataRequest {
            tickers: tickers.to_vec(),
            period: period.to_string(),
        };
        let rb = self.http.post(self.api.url("/portfolio/stock-data")).json(&req);
        self.decode(rb, "stock data").await
    }

    async fn holdings_data(&self, period: &str) -> Result<HoldingsResponse, ClientError> {
        let rb = self
            .http
            .get(self.api.url("/portfolio/holdings-data"))
            .query(&[("period", period)]);
        self.decode(rb, "holdings data").await
    }

    async fn run_hedge_fund(&self, req: &HedgeFundRunRequest) -> Result<ByteStream, ClientError> {
        debug!(tickers = ?req.tickers, agents = ?req.selected_agents, "hedge-fund/run");
        let rb = self
            .http
            .post(self.api.url("/hedge-fund/run"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(req);
        let resp = self.send(rb).await?;
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::transport))
            .boxed())
    }
}
