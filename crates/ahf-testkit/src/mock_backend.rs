use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use ahf_schemas::{
    normalize_ticker, ChartBar, CreatePortfolioRequest, ErrorBody, HedgeFundRunRequest, Portfolio,
    Position, PositionUpdate, RealizedGain, StockDataRequest, StockDataResponse, TickerData,
    UpdatePositionsRequest,
};
use anyhow::Context;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Route {
    GetPortfolio,
    Create,
    Positions,
    StockData,
    Holdings,
    Run,
}

/// Scripted `/hedge-fund/run` body.
#[derive(Debug, Clone, Default)]
pub struct RunScript {
    /// Full body text, `data: ...\n` lines.
    pub body: String,
    /// Bytes per chunk on the wire; 0 sends the body in one piece.
    pub chunk_size: usize,
    /// Keep the connection open after the last chunk.
    pub hang: bool,
}

impl RunScript {
    /// One `data: ` line per frame, chunked every `chunk_size` bytes.
    pub fn frames(frames: &[&str], chunk_size: usize) -> Self {
        let body = frames.iter().map(|f| format!("data: {f}\n")).collect();
        Self {
            body,
            chunk_size,
            hang: false,
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    fn chunks(&self) -> Vec<Bytes> {
        let raw = self.body.as_bytes();
        if self.chunk_size == 0 {
            return vec![Bytes::copy_from_slice(raw)];
        }
        raw.chunks(self.chunk_size)
            .map(Bytes::copy_from_slice)
            .collect()
    }
}

/// Mutable backend state. All fields are public so tests can seed and
/// inspect them directly.
#[derive(Default)]
pub struct MockState {
    pub portfolio: RwLock<Option<Portfolio>>,
    /// ticker -> current price
    pub prices: RwLock<BTreeMap<String, f64>>,
    /// ticker -> daily bars returned for any non-`1d` period
    pub history: RwLock<BTreeMap<String, Vec<ChartBar>>>,
    /// When set, `/portfolio/stock-data` answers 500 with this detail.
    pub stock_data_error: RwLock<Option<String>>,
    pub run_script: RwLock<RunScript>,
    pub last_positions: RwLock<Vec<PositionUpdate>>,
    pub last_stock_request: RwLock<Option<StockDataRequest>>,
    pub last_run: RwLock<Option<HedgeFundRunRequest>>,
    hits: RwLock<BTreeMap<Route, usize>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn hits(&self, route: Route) -> usize {
        self.hits.read().await.get(&route).copied().unwrap_or(0)
    }

    async fn hit(&self, route: Route) {
        *self.hits.write().await.entry(route).or_default() += 1;
    }

    pub async fn set_price(&self, ticker: &str, price: f64) {
        self.prices
            .write()
            .await
            .insert(normalize_ticker(ticker), price);
    }

    pub async fn set_run_script(&self, script: RunScript) {
        *self.run_script.write().await = script;
    }
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: msg.to_string(),
        }),
    )
        .into_response()
}

fn wrapped(message: &str, p: &Portfolio) -> Response {
    Json(json!({ "message": message, "portfolio": p })).into_response()
}

/// Bare router; [`spawn_mock`] adds the trace layer.
pub fn build_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/portfolio/", get(get_portfolio))
        .route("/portfolio/create", post(create_portfolio))
        .route("/portfolio/positions", put(update_positions))
        .route("/portfolio/stock-data", post(stock_data))
        .route("/portfolio/holdings-data", get(holdings_data))
        .route("/hedge-fund/run", post(run_hedge_fund))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// portfolio
// ---------------------------------------------------------------------------

async fn get_portfolio(State(st): State<Arc<MockState>>) -> Response {
    st.hit(Route::GetPortfolio).await;
    match st.portfolio.read().await.as_ref() {
        // the real backend answers bare here
        Some(p) => Json(p).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Portfolio not found"),
    }
}

async fn create_portfolio(
    State(st): State<Arc<MockState>>,
    Json(req): Json<CreatePortfolioRequest>,
) -> Response {
    st.hit(Route::Create).await;
    let tickers: Vec<String> = req.tickers.iter().map(|t| normalize_ticker(t)).collect();
    let p = Portfolio {
        cash: req.initial_cash,
        margin_requirement: req.margin_requirement,
        margin_used: 0.0,
        positions: tickers
            .iter()
            .map(|t| (t.clone(), Position::default()))
            .collect(),
        realized_gains: tickers
            .iter()
            .map(|t| (t.clone(), RealizedGain::default()))
            .collect(),
    };
    info!(cash = p.cash, tickers = ?tickers, "mock portfolio created");
    *st.portfolio.write().await = Some(p.clone());
    wrapped("Portfolio created successfully", &p)
}

async fn update_positions(
    State(st): State<Arc<MockState>>,
    Json(req): Json<UpdatePositionsRequest>,
) -> Response {
    st.hit(Route::Positions).await;
    *st.last_positions.write().await = req.positions.clone();

    let mut guard = st.portfolio.write().await;
    let Some(p) = guard.as_mut() else {
        return detail(StatusCode::NOT_FOUND, "Portfolio not found");
    };
    for u in &req.positions {
        let ticker = normalize_ticker(&u.ticker);
        p.realized_gains.entry(ticker.clone()).or_default();
        let pos = p.positions.entry(ticker).or_default();
        pos.long = u.long_shares;
        pos.short = u.short_shares;
        pos.long_cost_basis = u.long_cost_basis;
        pos.short_cost_basis = u.short_cost_basis;
    }
    wrapped("Portfolio positions updated", p)
}

// ---------------------------------------------------------------------------
// market data
// ---------------------------------------------------------------------------

async fn stock_data(State(st): State<Arc<MockState>>, Json(req): Json<StockDataRequest>) -> Response {
    st.hit(Route::StockData).await;
    *st.last_stock_request.write().await = Some(req.clone());
    if let Some(msg) = st.stock_data_error.read().await.as_deref() {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, msg);
    }

    let prices = st.prices.read().await;
    let history = st.history.read().await;
    let stock_data = req
        .tickers
        .iter()
        .map(|t| {
            let chart_data = if req.period == "1d" {
                Vec::new()
            } else {
                history.get(t).cloned().unwrap_or_default()
            };
            (
                t.clone(),
                TickerData {
                    current_price: prices.get(t).copied(),
                    chart_data,
                },
            )
        })
        .collect();
    Json(StockDataResponse { stock_data }).into_response()
}

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    #[serde(default)]
    period: Option<String>,
}

async fn holdings_data(State(st): State<Arc<MockState>>, Query(q): Query<PeriodQuery>) -> Response {
    st.hit(Route::Holdings).await;
    let Some(p) = st.portfolio.read().await.clone() else {
        return detail(StatusCode::NOT_FOUND, "Portfolio not found");
    };
    let prices = st.prices.read().await;
    let market_data: BTreeMap<&String, serde_json::Value> = p
        .active_positions()
        .map(|(t, _)| (t, json!({ "current_price": prices.get(t) })))
        .collect();
    Json(json!({
        "period": q.period.unwrap_or_else(|| "1mo".to_string()),
        "holdings": p.positions,
        "market_data": market_data,
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// analysis run
// ---------------------------------------------------------------------------

async fn run_hedge_fund(
    State(st): State<Arc<MockState>>,
    Json(req): Json<HedgeFundRunRequest>,
) -> Response {
    st.hit(Route::Run).await;
    info!(tickers = ?req.tickers, agents = ?req.selected_agents, "mock run started");
    *st.last_run.write().await = Some(req);

    let script = st.run_script.read().await.clone();
    let body = stream::iter(script.chunks().into_iter().map(Ok::<_, Infallible>));
    let body = if script.hang {
        Body::from_stream(body.chain(stream::pending()))
    } else {
        Body::from_stream(body)
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// serving
// ---------------------------------------------------------------------------

pub struct MockServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    pub handle: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the mock on an ephemeral localhost port.
pub async fn spawn_mock(state: Arc<MockState>) -> anyhow::Result<MockServer> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .context("bind mock backend")?;
    let addr = listener.local_addr().context("mock backend addr")?;
    let app = build_router(Arc::clone(&state)).layer(TraceLayer::new_for_http());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "mock backend stopped");
        }
    });

    Ok(MockServer {
        base_url: format!("http://{addr}"),
        addr,
        state,
        handle,
    })
}
