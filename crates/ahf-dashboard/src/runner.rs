//! Single-flight streamed analysis.
//!
//! `run_analysis` moves the session's [`RunState`](ahf_analysis::RunState)
//! `Idle|Completed|Failed -> Running -> Completed|Failed`. The `Start`
//! transition and the insertion of the progress entry happen under one write
//! lock, so two concurrent callers can never both pass the guard. Whatever
//! the outcome, the run leaves `Running` before `run_analysis` returns. If
//! the caller drops the future first, a [`RunGuard`] finishes the run as
//! failed on a spawned task.

use std::sync::Arc;

use ahf_analysis::{
    event_stream, find_team, reduce, AnalysisProgress, RunEvent, RunKey, StreamEvent, Team,
};
use ahf_client::BackendApi;
use ahf_schemas::{
    normalize_ticker, AnalysisResult, AnalysisStatus, DetailedAnalysis, HedgeFundRunRequest,
};
use chrono::{Days, Utc};
use futures_util::StreamExt;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RunRejected, ViewError};
use crate::state::{NoticeLevel, ViewEvent};
use crate::view::PortfolioView;

/// Error recorded when the stream ends without a `complete` frame.
pub const NO_RESULT: &str = "stream ended without a result";

const CANCELLED: &str = "analysis cancelled";

const ABANDONED: &str = "analysis abandoned";

/// Armed from `Start` until `finish` has run. Dropping it armed means the
/// `run_analysis` future was dropped mid-run.
struct RunGuard<B: BackendApi + 'static> {
    view: PortfolioView<B>,
    key: RunKey,
    run_id: Uuid,
    abort: Arc<Notify>,
    armed: bool,
}

impl<B: BackendApi + 'static> RunGuard<B> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<B: BackendApi + 'static> Drop for RunGuard<B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!(key = %self.key, "run dropped outside a runtime; state left running");
            return;
        };
        let view = self.view.clone();
        let key = self.key.clone();
        let run_id = self.run_id;
        let abort = Arc::clone(&self.abort);
        rt.spawn(async move { view.abandon(key, run_id, abort).await });
    }
}

impl<B: BackendApi + 'static> PortfolioView<B> {
    /// Run `team` over `ticker` and return the final result.
    ///
    /// Rejected without any network call when another run is in flight,
    /// when the team is unknown, or when `ticker` has no active position.
    /// Stream, transport and backend-reported failures are not returned as
    /// `Err`; they produce an `error`-status result instead.
    pub async fn run_analysis(&self, ticker: &str, team_name: &str) -> Result<AnalysisResult, ViewError> {
        let Some(team) = find_team(team_name) else {
            self.notice(NoticeLevel::Warning, format!("Unknown analyst team: {team_name}"));
            return Err(ViewError::UnknownTeam(team_name.to_string()));
        };
        let ticker = normalize_ticker(ticker);
        let key = RunKey::new(&ticker, team.name);
        let run_id = Uuid::new_v4();

        let abort = Arc::new(Notify::new());
        let req = match self.begin(&key, team, run_id, &abort).await {
            Ok(req) => req,
            Err(e) => {
                self.notice(NoticeLevel::Warning, e.to_string());
                return Err(e);
            }
        };
        let guard = RunGuard {
            view: self.clone(),
            key: key.clone(),
            run_id,
            abort: Arc::clone(&abort),
            armed: true,
        };
        info!(key = %key, run_id = %run_id, agents = team.members.len(), "analysis started");

        let outcome = self.drive(&key, team, &req, &abort).await;

        self.clear_abort(&abort).await;
        let result = self.finish(&key, run_id, outcome).await;
        guard.disarm();
        Ok(result)
    }

    /// Interrupt the run in flight, if any. It finishes as `error`.
    pub async fn cancel_analysis(&self) -> bool {
        match self.abort.read().await.as_ref() {
            Some(n) => {
                n.notify_one();
                true
            }
            None => false,
        }
    }

    // Guard + bookkeeping atomically, then the request from the same snapshot.
    // Nothing after `Start` awaits, so the caller's guard is in place before
    // the future can be dropped with the run marked running.
    async fn begin(
        &self,
        key: &RunKey,
        team: &Team,
        run_id: Uuid,
        abort: &Arc<Notify>,
    ) -> Result<HedgeFundRunRequest, ViewError> {
        let mut st = self.state.write().await;
        let mut slot = self.abort.write().await;

        let portfolio = st.portfolio.clone().ok_or(ViewError::NoPortfolio)?;
        if !portfolio
            .positions
            .get(&key.ticker)
            .is_some_and(|p| p.is_active())
        {
            return Err(ViewError::NotEligible(key.ticker.clone()));
        }

        if st.run.apply(RunEvent::Start(key.clone())).is_err() {
            let running = st
                .run
                .running_key()
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(RunRejected { running }.into());
        }
        // set with the guard so an early cancel is not lost
        *slot = Some(Arc::clone(abort));
        drop(slot);

        let progress = AnalysisProgress::new(key, team);
        st.progress.insert(key.to_string(), progress.clone());
        st.results
            .upsert_analysis(AnalysisResult::running(&key.ticker, &key.swarm, run_id));
        drop(st);
        self.emit(ViewEvent::Progress(progress));

        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(u64::from(self.settings.lookback_days)))
            .unwrap_or(end);

        Ok(HedgeFundRunRequest {
            tickers: vec![key.ticker.clone()],
            selected_agents: team.selected_agents().into_iter().map(String::from).collect(),
            model_name: self.settings.model_name.clone(),
            model_provider: self.settings.model_provider.clone(),
            start_date: start.format("%Y-%m-%d").to_string(),
            end_date: end.format("%Y-%m-%d").to_string(),
            initial_cash: portfolio.cash,
            margin_requirement: portfolio.margin_requirement,
            portfolio,
        })
    }

    async fn drive(
        &self,
        key: &RunKey,
        team: &Team,
        req: &HedgeFundRunRequest,
        abort: &Notify,
    ) -> Result<DetailedAnalysis, String> {
        let body = self
            .backend
            .run_hedge_fund(req)
            .await
            .map_err(|e| e.user_message())?;
        let events = event_stream(body);
        futures_util::pin_mut!(events);

        let progress_key = key.to_string();
        loop {
            let next = tokio::select! {
                ev = events.next() => ev,
                _ = abort.notified() => return Err(CANCELLED.to_string()),
            };

            match next {
                None => return Err(NO_RESULT.to_string()),
                Some(Err(e)) => return Err(e.user_message()),
                Some(Ok(StreamEvent::Complete(analysis))) => return Ok(analysis),
                Some(Ok(StreamEvent::Error(message))) => return Err(message),
                Some(Ok(StreamEvent::Progress(ev))) => {
                    debug!(key = %key, agent = %ev.agent, status = %ev.status, "progress");
                    let snapshot = {
                        let mut st = self.state.write().await;
                        st.progress.get_mut(&progress_key).map(|p| {
                            reduce(p, team, &ev);
                            p.clone()
                        })
                    };
                    if let Some(p) = snapshot {
                        self.emit(ViewEvent::Progress(p));
                    }
                }
            }
        }
    }

    async fn finish(
        &self,
        key: &RunKey,
        run_id: Uuid,
        outcome: Result<DetailedAnalysis, String>,
    ) -> AnalysisResult {
        let (result, event) = match outcome {
            Ok(analysis) => {
                info!(key = %key, run_id = %run_id, "analysis completed");
                let r = AnalysisResult::completed(&key.ticker, &key.swarm, run_id, analysis);
                (r, RunEvent::Complete)
            }
            Err(message) => {
                warn!(key = %key, run_id = %run_id, error = %message, "analysis failed");
                let r = AnalysisResult::failed(&key.ticker, &key.swarm, run_id, message);
                (r, RunEvent::Fail)
            }
        };

        let progress_key = key.to_string();
        let done = {
            let mut st = self.state.write().await;
            st.results.upsert_analysis(result.clone());
            if let Err(e) = st.run.apply(event) {
                warn!(key = %key, error = %e, "run state out of step");
            }
            match st.progress.get_mut(&progress_key) {
                Some(p) if result.status == AnalysisStatus::Completed => {
                    p.mark_complete();
                    Some(p.clone())
                }
                _ => None,
            }
        };

        if let Some(p) = done {
            self.emit(ViewEvent::Progress(p));
        }
        if result.status == AnalysisStatus::Error {
            let detail = result.error.clone().unwrap_or_default();
            self.notice(NoticeLevel::Error, format!("Analysis failed for {key}: {detail}"));
        }
        self.emit(ViewEvent::ResultWritten {
            ticker: result.ticker.clone(),
            swarm: result.swarm.clone(),
            status: result.status,
        });
        self.schedule_progress_clear(progress_key);
        result
    }

    async fn clear_abort(&self, abort: &Arc<Notify>) {
        let mut slot = self.abort.write().await;
        if slot.as_ref().is_some_and(|n| Arc::ptr_eq(n, abort)) {
            *slot = None;
        }
    }

    // Cleanup for a run whose future was dropped before `finish`.
    async fn abandon(&self, key: RunKey, run_id: Uuid, abort: Arc<Notify>) {
        self.clear_abort(&abort).await;
        let still_running = self.state.read().await.run.running_key() == Some(&key);
        if !still_running {
            return;
        }
        warn!(key = %key, run_id = %run_id, "analysis dropped mid-run");
        self.finish(&key, run_id, Err(ABANDONED.to_string())).await;
    }

    // Holds the finished entry on screen, then drops it unless a new run
    // for the same key has started meanwhile.
    fn schedule_progress_clear(&self, key: String) {
        let view = self.clone();
        let hold = self.settings.progress_hold;
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            let removed = {
                let mut st = view.state.write().await;
                let restarted = st.run.running_key().is_some_and(|k| k.to_string() == key);
                !restarted && st.progress.remove(&key).is_some()
            };
            if removed {
                view.emit(ViewEvent::ProgressCleared { key });
            }
        });
    }
}
