use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of portfolio history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioChartPoint {
    pub date: NaiveDate,
    /// Midnight UTC of `date`, epoch millis.
    pub timestamp: i64,
    pub total_value: f64,
    pub cash: f64,
    pub positions_value: f64,
    pub unrealized_gains: f64,
}
