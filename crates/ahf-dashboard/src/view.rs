use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ahf_client::{BackendApi, ClientError};
use ahf_portfolio::{
    build_history, holdings, validate_update, ChartPeriod, CreatePortfolioInput, HistorySeries, PortfolioSummary,
    PortfolioTotals, PositionMetrics,
};
use ahf_schemas::{normalize_ticker, HoldingsResponse, Portfolio, PositionUpdate};
use tokio::sync::{broadcast, Notify, RwLock};
use tracing::{error, info, warn};

use crate::confirm::Confirm;
use crate::error::ViewError;
use crate::state::{NoticeLevel, ViewEvent, ViewSettings, ViewState};

/// Handle to one dashboard session. Clones share the same state.
pub struct PortfolioView<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) state: Arc<RwLock<ViewState>>,
    pub(crate) bus: broadcast::Sender<ViewEvent>,
    pub(crate) settings: ViewSettings,
    pub(crate) refreshing: Arc<AtomicUsize>,
    /// Abort signal of the run in flight, if any.
    pub(crate) abort: Arc<RwLock<Option<Arc<Notify>>>>,
}

impl<B> Clone for PortfolioView<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            bus: self.bus.clone(),
            settings: self.settings.clone(),
            refreshing: Arc::clone(&self.refreshing),
            abort: Arc::clone(&self.abort),
        }
    }
}

impl<B: BackendApi + 'static> PortfolioView<B> {
    pub fn new(backend: Arc<B>, settings: ViewSettings) -> Self {
        let (bus, _rx) = broadcast::channel::<ViewEvent>(1024);
        let state = ViewState {
            period: settings.default_period,
            ..ViewState::default()
        };
        Self {
            backend,
            state: Arc::new(RwLock::new(state)),
            bus,
            settings,
            refreshing: Arc::new(AtomicUsize::new(0)),
            abort: Arc::new(RwLock::new(None)),
        }
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.bus.subscribe()
    }

    pub async fn snapshot(&self) -> ViewState {
        self.state.read().await.clone()
    }

    pub async fn portfolio(&self) -> Option<Portfolio> {
        self.state.read().await.portfolio.clone()
    }

    /// True while at least one price refresh (timer or manual) is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn emit(&self, ev: ViewEvent) {
        // no subscribers is fine
        let _ = self.bus.send(ev);
    }

    pub(crate) fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => info!(%message, "notice"),
            NoticeLevel::Warning => warn!(%message, "notice"),
            NoticeLevel::Error => error!(%message, "notice"),
        }
        self.emit(ViewEvent::Notice { level, message });
    }

    async fn replace_portfolio(&self, p: Portfolio) {
        {
            let mut st = self.state.write().await;
            st.portfolio = Some(p);
            st.chart = None;
        }
        self.emit(ViewEvent::PortfolioChanged);
    }

    // -----------------------------------------------------------------------
    // controller
    // -----------------------------------------------------------------------

    /// Replace the local portfolio with the backend's. On failure the prior
    /// state is kept and nothing is retried.
    pub async fn fetch_portfolio(&self) -> Result<Portfolio, ViewError> {
        match self.backend.get_portfolio().await {
            Ok(p) => {
                info!(cash = p.cash, positions = p.positions.len(), "portfolio fetched");
                self.replace_portfolio(p.clone()).await;
                Ok(p)
            }
            Err(e) => {
                warn!(error = %e, "portfolio fetch failed; keeping prior state");
                Err(e.into())
            }
        }
    }

    pub async fn create_portfolio(&self, input: &CreatePortfolioInput) -> Result<Portfolio, ViewError> {
        match self.backend.create_portfolio(&input.to_request()).await {
            Ok(p) => {
                info!(cash = p.cash, tickers = ?input.tickers, "portfolio created");
                self.replace_portfolio(p.clone()).await;
                Ok(p)
            }
            Err(e) => {
                error!(error = %e, "portfolio create failed");
                self.notice(NoticeLevel::Error, e.user_message());
                Err(e.into())
            }
        }
    }

    /// Full-replace one ticker's position. Invalid cost bases are rejected
    /// before any call.
    pub async fn update_position(&self, update: PositionUpdate) -> Result<Portfolio, ViewError> {
        if let Err(e) = validate_update(&update) {
            self.notice(NoticeLevel::Warning, e.to_string());
            return Err(e.into());
        }
        self.send_updates(vec![update]).await
    }

    /// Zero one ticker after confirmation. Declining issues no call.
    pub async fn remove_position(&self, ticker: &str, confirm: &dyn Confirm) -> Result<Portfolio, ViewError> {
        let ticker = normalize_ticker(ticker);
        if !confirm.confirm(&format!("Remove position {ticker}?")) {
            info!(ticker = %ticker, "removal declined");
            return Err(ViewError::Declined);
        }
        self.send_updates(vec![PositionUpdate::zeroed(&ticker)]).await
    }

    /// Zero every active position in a single call after confirmation.
    pub async fn remove_all_positions(&self, confirm: &dyn Confirm) -> Result<Portfolio, ViewError> {
        let portfolio = self.portfolio().await.ok_or(ViewError::NoPortfolio)?;
        let tickers = portfolio.active_tickers();
        if tickers.is_empty() {
            return Ok(portfolio);
        }
        if !confirm.confirm(&format!("Remove all {} positions?", tickers.len())) {
            info!("remove-all declined");
            return Err(ViewError::Declined);
        }
        let updates = tickers.iter().map(|t| PositionUpdate::zeroed(t)).collect();
        self.send_updates(updates).await
    }

    // Local state changes only after the backend acknowledges.
    async fn send_updates(&self, updates: Vec<PositionUpdate>) -> Result<Portfolio, ViewError> {
        match self.backend.update_positions(&updates).await {
            Ok(p) => {
                info!(count = updates.len(), "positions updated");
                self.replace_portfolio(p.clone()).await;
                Ok(p)
            }
            Err(e) => {
                warn!(error = %e, count = updates.len(), "position update rejected");
                self.notice(NoticeLevel::Error, e.user_message());
                Err(e.into())
            }
        }
    }

    /// Dashboard holdings snapshot; passed through untouched.
    pub async fn holdings_data(&self, period: ChartPeriod) -> Result<HoldingsResponse, ClientError> {
        self.backend.holdings_data(period.as_api_str()).await
    }

    // -----------------------------------------------------------------------
    // chart
    // -----------------------------------------------------------------------

    pub async fn set_period(&self, period: ChartPeriod) -> Option<HistorySeries> {
        {
            let mut st = self.state.write().await;
            if st.period != period {
                st.chart = None;
            }
            st.period = period;
        }
        self.refresh_chart().await
    }

    /// Recompute the chart for the current portfolio and period. `None`
    /// without a portfolio.
    pub async fn refresh_chart(&self) -> Option<HistorySeries> {
        let (portfolio, period) = {
            let st = self.state.read().await;
            (st.portfolio.clone()?, st.period)
        };
        let today = chrono::Utc::now().date_naive();
        let series = build_history(self.backend.as_ref(), &portfolio, period, today).await;

        {
            let mut st = self.state.write().await;
            // a newer portfolio or period superseded this computation
            if st.portfolio.as_ref() != Some(&portfolio) || st.period != period {
                return Some(series);
            }
            st.chart = Some(series.clone());
        }
        self.emit(ViewEvent::ChartUpdated {
            source: series.source,
            points: series.points.len(),
        });
        Some(series)
    }

    // -----------------------------------------------------------------------
    // derived metrics
    // -----------------------------------------------------------------------

    pub async fn holding_metrics(&self) -> Vec<PositionMetrics> {
        let st = self.state.read().await;
        let Some(p) = st.portfolio.as_ref() else {
            return Vec::new();
        };
        let prices = st.results.prices_for(p.positions.keys());
        holdings(p, &prices)
    }

    pub async fn totals(&self) -> Option<PortfolioTotals> {
        let st = self.state.read().await;
        let p = st.portfolio.as_ref()?;
        let prices = st.results.prices_for(p.positions.keys());
        Some(PortfolioTotals::compute(p, &prices))
    }

    pub async fn summary(&self) -> Option<PortfolioSummary> {
        self.state
            .read()
            .await
            .portfolio
            .as_ref()
            .map(PortfolioSummary::compute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{AlwaysConfirm, NeverConfirm};
    use crate::fake::{portfolio_with, FakeBackend};
    use ahf_portfolio::HistorySource;

    fn view(fake: FakeBackend) -> (Arc<FakeBackend>, PortfolioView<FakeBackend>) {
        let fake = Arc::new(fake);
        (Arc::clone(&fake), PortfolioView::new(fake, ViewSettings::default()))
    }

    #[tokio::test]
    async fn failed_fetch_keeps_prior_state() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[("AAPL", 10, 150.0)])));
        v.fetch_portfolio().await.unwrap();
        let before = v.snapshot().await.portfolio;

        fake.fail_next_get(ClientError::Transport("connection reset".into()));
        assert!(v.fetch_portfolio().await.is_err());
        assert_eq!(v.snapshot().await.portfolio, before);
    }

    #[tokio::test]
    async fn repeated_fetch_is_idempotent() {
        let (_f, v) = view(FakeBackend::with_portfolio(portfolio_with(&[("AAPL", 10, 150.0)])));
        v.fetch_portfolio().await.unwrap();
        let first = v.snapshot().await.portfolio;
        v.fetch_portfolio().await.unwrap();
        v.fetch_portfolio().await.unwrap();
        assert_eq!(v.snapshot().await.portfolio, first);
    }

    #[tokio::test]
    async fn uncreated_until_create_succeeds() {
        let (fake, v) = view(FakeBackend::uncreated());
        assert!(matches!(
            v.fetch_portfolio().await,
            Err(ViewError::Backend(ClientError::Server { status: 404, .. }))
        ));
        assert!(v.portfolio().await.is_none());

        let input = CreatePortfolioInput::parse("100000", "0.5", "AAPL,MSFT").unwrap();
        let p = v.create_portfolio(&input).await.unwrap();
        assert_eq!(p.cash, 100_000.0);
        assert_eq!(v.portfolio().await, Some(p));
        assert_eq!(fake.calls("create"), 1);
    }

    #[tokio::test]
    async fn invalid_cost_basis_is_rejected_without_a_call() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[("AAPL", 10, 150.0)])));
        v.fetch_portfolio().await.unwrap();
        let before = v.portfolio().await;

        for bad in [-0.01, f64::INFINITY] {
            let err = v.update_position(PositionUpdate::long("AAPL", 5, bad)).await.unwrap_err();
            assert!(matches!(
                err,
                ViewError::Input(ahf_portfolio::InputError::InvalidCostBasis { .. })
            ));
        }
        assert_eq!(fake.calls("update"), 0);
        assert_eq!(v.portfolio().await, before);
    }

    #[tokio::test]
    async fn rejected_update_surfaces_detail_and_changes_nothing() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[("AAPL", 10, 150.0)])));
        v.fetch_portfolio().await.unwrap();
        let before = v.portfolio().await;
        let mut rx = v.subscribe();

        fake.fail_next_update(ClientError::Server {
            status: 400,
            detail: "Insufficient cash".into(),
        });
        let err = v.update_position(PositionUpdate::long("AAPL", 1_000_000, 150.0)).await;
        assert!(err.is_err());
        assert_eq!(v.portfolio().await, before);

        match rx.recv().await.unwrap() {
            ViewEvent::Notice { level, message } => {
                assert_eq!(level, NoticeLevel::Error);
                assert_eq!(message, "Insufficient cash");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn declined_removal_issues_no_call() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[
            ("AAPL", 10, 150.0),
            ("MSFT", 5, 300.0),
        ])));
        v.fetch_portfolio().await.unwrap();

        assert_eq!(v.remove_position("AAPL", &NeverConfirm).await, Err(ViewError::Declined));
        assert_eq!(v.remove_all_positions(&NeverConfirm).await, Err(ViewError::Declined));
        assert_eq!(fake.calls("update"), 0);
        assert_eq!(v.portfolio().await.unwrap().active_tickers(), vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn remove_all_sends_one_zeroed_entry_per_active_ticker() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[
            ("AAPL", 10, 150.0),
            ("MSFT", 5, 300.0),
            ("IDLE", 0, 0.0),
        ])));
        v.fetch_portfolio().await.unwrap();

        let p = v.remove_all_positions(&AlwaysConfirm).await.unwrap();
        assert_eq!(fake.calls("update"), 1);
        let sent = fake.last_update();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(PositionUpdate::is_zeroed));
        assert_eq!(
            sent.iter().map(|u| u.ticker.as_str()).collect::<Vec<_>>(),
            vec!["AAPL", "MSFT"]
        );
        assert!(!p.has_active_positions());
        assert_eq!(p.positions.len(), 3, "zeroed entries persist");
    }

    #[tokio::test]
    async fn remove_single_position_zeroes_it() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[("AAPL", 10, 150.0)])));
        v.fetch_portfolio().await.unwrap();
        let p = v.remove_position("aapl", &AlwaysConfirm).await.unwrap();
        assert_eq!(fake.last_update(), vec![PositionUpdate::zeroed("AAPL")]);
        assert!(!p.positions["AAPL"].is_active());
    }

    #[tokio::test]
    async fn metrics_follow_acknowledged_portfolio_and_prices() {
        let (fake, v) = view(FakeBackend::with_portfolio(portfolio_with(&[])));
        v.fetch_portfolio().await.unwrap();
        v.update_position(PositionUpdate::long("AAPL", 10, 150.0)).await.unwrap();

        let m = v.holding_metrics().await;
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].position_value, 1500.0);
        assert!(m[0].unrealized_gain.is_none());

        fake.set_price("AAPL", 165.0);
        v.refresh_prices().await.unwrap();
        let m = v.holding_metrics().await;
        assert_eq!(m[0].unrealized_gain, Some(150.0));
        assert_eq!(m[0].unrealized_gain_percent, Some(10.0));

        let t = v.totals().await.unwrap();
        assert_eq!(t.unrealized_gain_percent, 10.0);
    }

    #[tokio::test]
    async fn chart_period_change_recomputes() {
        let (_f, v) = view(FakeBackend::with_portfolio(portfolio_with(&[])));
        assert!(v.refresh_chart().await.is_none());
        v.fetch_portfolio().await.unwrap();

        let s = v.set_period(ChartPeriod::SixMonths).await.unwrap();
        assert_eq!(s.source, HistorySource::Flat);
        assert_eq!(s.points.len(), 181);
        assert_eq!(v.snapshot().await.chart, Some(s));

        // portfolio change invalidates
        v.fetch_portfolio().await.unwrap();
        assert!(v.snapshot().await.chart.is_none());
    }
}
