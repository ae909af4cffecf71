//! ahf-config
//!
//! Two concerns:
//! - `api`: backend base-URL resolution from an explicit precedence list.
//! - layered YAML settings (`load_layered_yaml*`): later layers override
//!   individual leaves of earlier ones, and the merge decodes into [`Settings`].

pub mod api;
mod settings;

pub use api::{ApiConfig, BaseUrlInputs, BaseUrlSource, BASE_URL_PRECEDENCE};
pub use settings::{AnalysisSettings, ChartSettings, PriceSettings, Settings};

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;

pub fn load_layered_yaml(paths: &[&str]) -> Result<Settings> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML docs in order (later docs override) and decode [`Settings`].
///
/// An empty slice yields the defaults.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<Settings> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    let settings: Settings = serde_json::from_value(merged).context("settings do not match schema")?;
    settings.validate()?;
    tracing::debug!(
        model = %settings.analysis.model_name,
        poll_secs = settings.prices.poll_interval_secs,
        "settings merged"
    );
    Ok(settings)
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}
