use std::collections::BTreeMap;
use std::time::Duration;

use ahf_analysis::{AnalysisProgress, RunState};
use ahf_config::Settings;
use ahf_portfolio::{ChartPeriod, HistorySeries, HistorySource, ResultStore, UnknownPeriod};
use ahf_schemas::{AnalysisStatus, Portfolio};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Messages broadcast to view observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// User-facing message; server-reported details are passed verbatim.
    Notice { level: NoticeLevel, message: String },
    PortfolioChanged,
    PricesRefreshed { tickers: usize },
    ChartUpdated { source: HistorySource, points: usize },
    Progress(AnalysisProgress),
    ResultWritten {
        ticker: String,
        swarm: String,
        status: AnalysisStatus,
    },
    ProgressCleared { key: String },
}

/// Everything the view owns. A clone is a consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// `None` until fetched or created.
    pub portfolio: Option<Portfolio>,
    pub results: ResultStore,
    /// `ticker-swarm` -> live progress
    pub progress: BTreeMap<String, AnalysisProgress>,
    pub run: RunState,
    pub period: ChartPeriod,
    /// Cleared whenever the portfolio changes.
    pub chart: Option<HistorySeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub model_name: String,
    pub model_provider: String,
    pub lookback_days: u32,
    pub progress_hold: Duration,
    pub poll_interval: Duration,
    pub default_period: ChartPeriod,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            model_provider: "OpenAI".to_string(),
            lookback_days: 90,
            progress_hold: Duration::from_secs(2),
            poll_interval: Duration::from_secs(120),
            default_period: ChartPeriod::OneMonth,
        }
    }
}

impl ViewSettings {
    pub fn from_settings(s: &Settings) -> Result<Self, UnknownPeriod> {
        Ok(Self {
            model_name: s.analysis.model_name.clone(),
            model_provider: s.analysis.model_provider.clone(),
            lookback_days: s.analysis.lookback_days,
            progress_hold: Duration::from_millis(s.analysis.progress_hold_ms),
            poll_interval: Duration::from_secs(s.prices.poll_interval_secs),
            default_period: ChartPeriod::parse(&s.chart.default_period)?,
        })
    }
}
