use std::collections::BTreeMap;

use ahf_schemas::{normalize_ticker, AnalysisResult};

/// ticker -> latest known price
pub type PriceMap = BTreeMap<String, f64>;

/// Analysis results split into two replace-key spaces.
///
/// - analysis channel: one record per `(ticker, swarm)`; a new record for the
///   same pair replaces the old one.
/// - real-time channel: the latest price-poll batch, replaced wholesale.
///
/// Neither channel ever touches the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    analysis: BTreeMap<(String, String), AnalysisResult>,
    realtime: BTreeMap<String, AnalysisResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `(result.ticker, result.swarm)`.
    ///
    /// Real-time records are refused; they only enter through
    /// [`replace_realtime`](Self::replace_realtime). Returns whether the
    /// record was stored.
    pub fn upsert_analysis(&mut self, result: AnalysisResult) -> bool {
        if result.is_real_time() {
            return false;
        }
        let key = (normalize_ticker(&result.ticker), result.swarm.clone());
        self.analysis.insert(key, result);
        true
    }

    /// Drop every real-time record and store `batch` in their place.
    /// Non-real-time entries in `batch` are ignored.
    pub fn replace_realtime(&mut self, batch: impl IntoIterator<Item = AnalysisResult>) {
        self.realtime = batch
            .into_iter()
            .filter(AnalysisResult::is_real_time)
            .map(|r| (normalize_ticker(&r.ticker), r))
            .collect();
    }

    pub fn analysis(&self, ticker: &str, swarm: &str) -> Option<&AnalysisResult> {
        self.analysis
            .get(&(normalize_ticker(ticker), swarm.to_string()))
    }

    pub fn realtime(&self, ticker: &str) -> Option<&AnalysisResult> {
        self.realtime.get(&normalize_ticker(ticker))
    }

    /// Analysis records, ordered by `(ticker, swarm)`.
    pub fn analyses(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.analysis.values()
    }

    pub fn analyses_for<'a>(&'a self, ticker: &str) -> impl Iterator<Item = &'a AnalysisResult> {
        let ticker = normalize_ticker(ticker);
        self.analysis
            .iter()
            .filter(move |((t, _), _)| *t == ticker)
            .map(|(_, r)| r)
    }

    pub fn realtime_len(&self) -> usize {
        self.realtime.len()
    }

    /// Real-time price if polled, else the price reported by the newest
    /// analysis of `ticker`.
    pub fn latest_price(&self, ticker: &str) -> Option<f64> {
        if let Some(p) = self.realtime(ticker).and_then(|r| r.current_price) {
            return Some(p);
        }
        let ticker = normalize_ticker(ticker);
        self.analyses_for(&ticker)
            .filter_map(|r| {
                r.detailed_analysis
                    .as_ref()
                    .and_then(|d| d.reported_price(&ticker))
                    .map(|p| (r.timestamp, p))
            })
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, p)| p)
    }

    /// [`latest_price`](Self::latest_price) for each of `tickers` that has one.
    pub fn prices_for<'a>(&self, tickers: impl IntoIterator<Item = &'a String>) -> PriceMap {
        tickers
            .into_iter()
            .filter_map(|t| self.latest_price(t).map(|p| (t.clone(), p)))
            .collect()
    }
}
