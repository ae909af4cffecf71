use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ahf_client::BackendApi;
use ahf_schemas::AnalysisResult;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ViewError;
use crate::state::ViewEvent;
use crate::view::PortfolioView;

/// `period` sent for real-time price refreshes.
pub const PRICE_PERIOD: &str = "1d";

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<B: BackendApi + 'static> PortfolioView<B> {
    /// Fetch current prices for all active tickers and replace the
    /// real-time result batch. Analysis results are never touched.
    ///
    /// Returns the number of prices stored. Timer-driven and manual calls
    /// may overlap; whichever resolves last wins.
    pub async fn refresh_prices(&self) -> Result<usize, ViewError> {
        let tickers = match self.state.read().await.portfolio.as_ref() {
            Some(p) => p.active_tickers(),
            None => return Err(ViewError::NoPortfolio),
        };
        if tickers.is_empty() {
            return Ok(0);
        }

        let _busy = InFlight::enter(&self.refreshing);
        debug!(tickers = tickers.len(), "price refresh started");

        let data = match self.backend.stock_data(&tickers, PRICE_PERIOD).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "price refresh failed; keeping prior prices");
                return Err(e.into());
            }
        };

        let wanted: BTreeSet<&String> = tickers.iter().collect();
        let batch: Vec<AnalysisResult> = data
            .stock_data
            .iter()
            .filter(|(t, _)| wanted.contains(t))
            .filter_map(|(t, d)| d.current_price.map(|p| AnalysisResult::real_time(t, p)))
            .collect();
        let n = batch.len();

        self.state.write().await.results.replace_realtime(batch);
        info!(tickers = n, "prices refreshed");
        self.emit(ViewEvent::PricesRefreshed { tickers: n });
        Ok(n)
    }

    /// Refresh prices now and then every `interval` while the portfolio has
    /// active positions. Each refresh runs on its own task so the timer keeps
    /// its cadence; a tick that finds a refresh still in flight is skipped.
    pub fn spawn_price_poller(&self, interval: Duration) -> JoinHandle<()> {
        let view = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let active = view
                    .state
                    .read()
                    .await
                    .portfolio
                    .as_ref()
                    .is_some_and(|p| p.has_active_positions());
                if !active {
                    continue;
                }
                if view.is_refreshing() {
                    debug!("refresh still in flight; tick skipped");
                    continue;
                }
                let v = view.clone();
                tokio::spawn(async move {
                    if let Err(e) = v.refresh_prices().await {
                        debug!(error = %e, "poll tick failed");
                    }
                });
            }
        })
    }
}
