//! Scenario: layered settings files
//!
//! GREEN when:
//! - files merge in order, later layers overriding individual leaves;
//! - key order inside a layer does not change the result;
//! - invalid values and API keys are rejected at load time.

use std::io::Write;

use ahf_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE: &str = r#"
analysis:
  model_name: "gpt-4o"
  model_provider: "OpenAI"
  lookback_days: 90
prices:
  poll_interval_secs: 120
"#;

const BASE_REORDERED: &str = r#"
prices:
  poll_interval_secs: 120
analysis:
  lookback_days: 90
  model_provider: "OpenAI"
  model_name: "gpt-4o"
"#;

const OVERLAY: &str = r#"
analysis:
  model_provider: "Anthropic"
chart:
  default_period: "6mo"
"#;

fn write_tmp(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn files_merge_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_tmp(&dir, "base.yaml", BASE);
    let overlay = write_tmp(&dir, "local.yaml", OVERLAY);

    let s = load_layered_yaml(&[base.as_str(), overlay.as_str()]).unwrap();
    assert_eq!(s.analysis.model_name, "gpt-4o");
    assert_eq!(s.analysis.model_provider, "Anthropic");
    assert_eq!(s.chart.default_period, "6mo");
    assert_eq!(s.prices.poll_interval_secs, 120);
    assert_eq!(s.analysis.progress_hold_ms, 2_000, "untouched keys keep defaults");
}

#[test]
fn key_order_does_not_matter() {
    let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_REORDERED]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn api_key_in_a_layer_is_refused() {
    let leaked = "analysis:\n  model_name: sk-live-0123456789\n";
    let err = load_layered_yaml_from_strings(&[BASE, leaked]).unwrap_err();
    assert!(err.to_string().contains("analysis.model_name"));
}

#[test]
fn invalid_period_is_rejected() {
    let bad = "chart:\n  default_period: \"2w\"\n";
    let err = load_layered_yaml_from_strings(&[bad]).unwrap_err();
    assert!(err.to_string().contains("default_period"));
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/nonexistent/ahf.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/ahf.yaml"));
}
