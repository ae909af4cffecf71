use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Synthetic swarm tag used by the price poller. Records under this tag live
/// in their own replace-key space and never collide with analysis runs.
pub const REAL_TIME_SWARM: &str = "real-time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Running,
    Completed,
    Error,
}

/// One analysis outcome for a `(ticker, swarm)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub swarm: String,
    pub status: AnalysisStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub run_id: Option<Uuid>,
    #[serde(default)]
    pub detailed_analysis: Option<DetailedAnalysis>,
    /// Only set on real-time records.
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn running(ticker: &str, swarm: &str, run_id: Uuid) -> Self {
        Self {
            ticker: ticker.to_string(),
            swarm: swarm.to_string(),
            status: AnalysisStatus::Running,
            timestamp: Utc::now(),
            run_id: Some(run_id),
            detailed_analysis: None,
            current_price: None,
            error: None,
        }
    }

    pub fn completed(ticker: &str, swarm: &str, run_id: Uuid, analysis: DetailedAnalysis) -> Self {
        Self {
            status: AnalysisStatus::Completed,
            detailed_analysis: Some(analysis),
            ..Self::running(ticker, swarm, run_id)
        }
    }

    pub fn failed(ticker: &str, swarm: &str, run_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Error,
            error: Some(error.into()),
            ..Self::running(ticker, swarm, run_id)
        }
    }

    pub fn real_time(ticker: &str, current_price: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            swarm: REAL_TIME_SWARM.to_string(),
            status: AnalysisStatus::Completed,
            timestamp: Utc::now(),
            run_id: None,
            detailed_analysis: None,
            current_price: Some(current_price),
            error: None,
        }
    }

    pub fn is_real_time(&self) -> bool {
        self.swarm == REAL_TIME_SWARM
    }

    /// Decision for this result's own ticker, if the run produced one.
    pub fn decision(&self) -> Option<&TradingDecision> {
        self.detailed_analysis
            .as_ref()
            .and_then(|d| d.decisions.get(&self.ticker))
    }
}

/// Payload of the stream's `complete` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    #[serde(default)]
    pub decisions: BTreeMap<String, TradingDecision>,
    /// agent name -> ticker -> signal
    #[serde(default)]
    pub analyst_signals: BTreeMap<String, BTreeMap<String, AnalystSignal>>,
}

impl DetailedAnalysis {
    /// Any `current_price` an agent reported for `ticker` (the risk manager does).
    pub fn reported_price(&self, ticker: &str) -> Option<f64> {
        self.analyst_signals
            .values()
            .filter_map(|by_ticker| by_ticker.get(ticker))
            .find_map(|s| s.current_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDecision {
    pub action: TradeAction,
    #[serde(default, deserialize_with = "de_quantity")]
    pub quantity: u64,
    /// 0-100
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

/// Agents reason either in prose or as a mapping of sub-factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reasoning {
    Text(String),
    Factors(serde_json::Map<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystSignal {
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<Reasoning>,
    #[serde(default)]
    pub remaining_position_limit: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub strategy_signals: Option<BTreeMap<String, StrategySignal>>,
    /// Agent-specific fields not modelled above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metrics: Option<Value>,
}

// The portfolio manager sometimes emits quantities as floats ("5.0").
fn de_quantity<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = f64::deserialize(d)?;
    if !v.is_finite() || v < 0.0 {
        return Err(D::Error::custom(format!("invalid quantity: {v}")));
    }
    Ok(v.trunc() as u64)
}
