//! In-memory `BackendApi` for view tests. Mirrors the backend's
//! full-replace position semantics.

use std::collections::BTreeMap;
use std::sync::Mutex;

use ahf_client::{BackendApi, ByteStream, ClientError};
use ahf_schemas::{
    CreatePortfolioRequest, HedgeFundRunRequest, HoldingsResponse, Portfolio, Position,
    PositionUpdate, RealizedGain, StockDataResponse, TickerData,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Body chunks, then close.
    Chunks(Vec<String>),
    /// Body chunks, then stay open forever.
    Hang(Vec<String>),
    /// The run request itself fails.
    Refuse(ClientError),
}

#[derive(Default)]
struct Inner {
    portfolio: Option<Portfolio>,
    prices: BTreeMap<String, f64>,
    fail_get: Option<ClientError>,
    fail_update: Option<ClientError>,
    fail_stock: Option<ClientError>,
    stock_delay: Option<std::time::Duration>,
    script: Option<Script>,
    calls: BTreeMap<&'static str, usize>,
    last_update: Vec<PositionUpdate>,
    last_stock: (Vec<String>, String),
    last_run: Option<HedgeFundRunRequest>,
}

pub(crate) struct FakeBackend {
    inner: Mutex<Inner>,
}

pub(crate) fn portfolio_with(positions: &[(&str, u64, f64)]) -> Portfolio {
    Portfolio {
        cash: 100_000.0,
        margin_requirement: 0.5,
        margin_used: 0.0,
        positions: positions
            .iter()
            .map(|(t, long, cb)| {
                (
                    t.to_string(),
                    Position {
                        long: *long,
                        long_cost_basis: *cb,
                        ..Position::default()
                    },
                )
            })
            .collect(),
        realized_gains: BTreeMap::new(),
    }
}

fn not_found() -> ClientError {
    ClientError::Server {
        status: 404,
        detail: "Portfolio not found".into(),
    }
}

impl FakeBackend {
    pub fn uncreated() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_portfolio(p: Portfolio) -> Self {
        let f = Self::uncreated();
        f.inner.lock().unwrap().portfolio = Some(p);
        f
    }

    fn hit(&self, route: &'static str) -> std::sync::MutexGuard<'_, Inner> {
        let mut g = self.inner.lock().unwrap();
        *g.calls.entry(route).or_default() += 1;
        g
    }

    pub fn calls(&self, route: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .get(route)
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_next_get(&self, e: ClientError) {
        self.inner.lock().unwrap().fail_get = Some(e);
    }

    pub fn fail_next_update(&self, e: ClientError) {
        self.inner.lock().unwrap().fail_update = Some(e);
    }

    pub fn fail_next_stock(&self, e: ClientError) {
        self.inner.lock().unwrap().fail_stock = Some(e);
    }

    pub fn delay_stock(&self, d: std::time::Duration) {
        self.inner.lock().unwrap().stock_delay = Some(d);
    }

    pub fn set_price(&self, ticker: &str, price: f64) {
        self.inner.lock().unwrap().prices.insert(ticker.into(), price);
    }

    pub fn clear_price(&self, ticker: &str) {
        self.inner.lock().unwrap().prices.remove(ticker);
    }

    pub fn script_run(&self, s: Script) {
        self.inner.lock().unwrap().script = Some(s);
    }

    pub fn last_update(&self) -> Vec<PositionUpdate> {
        self.inner.lock().unwrap().last_update.clone()
    }

    pub fn last_stock_request(&self) -> (Vec<String>, String) {
        self.inner.lock().unwrap().last_stock.clone()
    }

    pub fn last_run_request(&self) -> HedgeFundRunRequest {
        self.inner.lock().unwrap().last_run.clone().unwrap()
    }
}

fn body(chunks: Vec<String>) -> impl futures_util::Stream<Item = Result<Bytes, ClientError>> + Send {
    stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn get_portfolio(&self) -> Result<Portfolio, ClientError> {
        let mut g = self.hit("get");
        if let Some(e) = g.fail_get.take() {
            return Err(e);
        }
        g.portfolio.clone().ok_or_else(not_found)
    }

    async fn create_portfolio(&self, req: &CreatePortfolioRequest) -> Result<Portfolio, ClientError> {
        let mut g = self.hit("create");
        let p = Portfolio {
            cash: req.initial_cash,
            margin_requirement: req.margin_requirement,
            margin_used: 0.0,
            positions: req
                .tickers
                .iter()
                .map(|t| (t.clone(), Position::default()))
                .collect(),
            realized_gains: req
                .tickers
                .iter()
                .map(|t| (t.clone(), RealizedGain::default()))
                .collect(),
        };
        g.portfolio = Some(p.clone());
        Ok(p)
    }

    async fn update_positions(&self, positions: &[PositionUpdate]) -> Result<Portfolio, ClientError> {
        let mut g = self.hit("update");
        g.last_update = positions.to_vec();
        if let Some(e) = g.fail_update.take() {
            return Err(e);
        }
        let p = g.portfolio.as_mut().ok_or_else(not_found)?;
        for u in positions {
            p.realized_gains.entry(u.ticker.clone()).or_default();
            let pos = p.positions.entry(u.ticker.clone()).or_default();
            pos.long = u.long_shares;
            pos.short = u.short_shares;
            pos.long_cost_basis = u.long_cost_basis;
            pos.short_cost_basis = u.short_cost_basis;
        }
        Ok(p.clone())
    }

    async fn stock_data(&self, tickers: &[String], period: &str) -> Result<StockDataResponse, ClientError> {
        let delay = {
            let mut g = self.hit("stock");
            g.last_stock = (tickers.to_vec(), period.to_string());
            g.stock_delay
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let mut g = self.inner.lock().unwrap();
        if let Some(e) = g.fail_stock.take() {
            return Err(e);
        }
        let stock_data = tickers
            .iter()
            .map(|t| {
                (
                    t.clone(),
                    TickerData {
                        current_price: g.prices.get(t).copied(),
                        chart_data: Vec::new(),
                    },
                )
            })
            .collect();
        Ok(StockDataResponse { stock_data })
    }

    async fn holdings_data(&self, _period: &str) -> Result<HoldingsResponse, ClientError> {
        let _g = self.hit("holdings");
        Ok(HoldingsResponse::default())
    }

    async fn run_hedge_fund(&self, req: &HedgeFundRunRequest) -> Result<ByteStream, ClientError> {
        let mut g = self.hit("run");
        g.last_run = Some(req.clone());
        match g.script.clone() {
            Some(Script::Chunks(c)) => Ok(body(c).boxed()),
            Some(Script::Hang(c)) => Ok(body(c).chain(stream::pending()).boxed()),
            Some(Script::Refuse(e)) => Err(e),
            None => Err(ClientError::Transport("no run scripted".into())),
        }
    }
}
