use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Provider API key prefixes. Keys come from the backend's environment; a
/// settings file carrying one is refused.
const KEY_PREFIXES: &[&str] = &["sk-", "sk_live", "gsk_", "AIza", "AKIA", "xai-"];

/// Typed view of the merged settings document. Every key has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisSettings,
    pub prices: PriceSettings,
    pub chart: ChartSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("analysis.model_name", &self.analysis.model_name),
            ("analysis.model_provider", &self.analysis.model_provider),
        ] {
            if looks_like_key(value) {
                bail!("{field} looks like an API key (value redacted); keys belong in the backend environment");
            }
        }
        if self.analysis.model_name.trim().is_empty() {
            bail!("analysis.model_name must not be empty");
        }
        if self.analysis.lookback_days == 0 {
            bail!("analysis.lookback_days must be > 0");
        }
        if self.prices.poll_interval_secs == 0 {
            bail!("prices.poll_interval_secs must be > 0");
        }
        if !matches!(self.chart.default_period.as_str(), "1mo" | "3mo" | "6mo" | "1y") {
            bail!(
                "chart.default_period '{}' invalid; expected 1mo | 3mo | 6mo | 1y",
                self.chart.default_period
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub model_name: String,
    pub model_provider: String,
    /// Run window is `today - lookback_days ..= today`.
    pub lookback_days: u32,
    /// How long a finished run's progress entry stays visible.
    pub progress_hold_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            model_provider: "OpenAI".to_string(),
            lookback_days: 90,
            progress_hold_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    pub poll_interval_secs: u64,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub default_period: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_period: "1mo".to_string(),
        }
    }
}

fn looks_like_key(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && KEY_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_refused_and_redacted() {
        let mut s = Settings::default();
        s.analysis.model_provider = "sk-abcdefghijklmnop".into();
        let err = s.validate().unwrap_err().to_string();
        assert!(err.contains("analysis.model_provider"));
        assert!(!err.contains("abcdefgh"));
    }

    #[test]
    fn zero_intervals_are_refused() {
        let mut s = Settings::default();
        s.prices.poll_interval_secs = 0;
        assert!(s.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }
}
