use ahf_schemas::{normalize_ticker, CreatePortfolioRequest, PositionUpdate};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("initial cash must be a finite non-negative number, got {0:?}")]
    InvalidCash(String),
    #[error("margin requirement must be a fraction in [0, 1], got {0:?}")]
    InvalidMargin(String),
    #[error("{ticker} {side} cost basis must be a finite non-negative number, got {value}")]
    InvalidCostBasis {
        ticker: String,
        side: &'static str,
        value: f64,
    },
}

/// Cost bases must be finite and non-negative. Share counts are unsigned
/// already.
pub fn validate_update(u: &PositionUpdate) -> Result<(), InputError> {
    for (side, value) in [("long", u.long_cost_basis), ("short", u.short_cost_basis)] {
        if !value.is_finite() || value < 0.0 {
            return Err(InputError::InvalidCostBasis {
                ticker: u.ticker.clone(),
                side,
                value,
            });
        }
    }
    Ok(())
}

/// Validated form of the create-portfolio inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePortfolioInput {
    pub initial_cash: f64,
    pub margin_requirement: f64,
    /// Normalized, de-duplicated, in entry order.
    pub tickers: Vec<String>,
}

impl CreatePortfolioInput {
    /// `tickers` is comma-separated; entries are trimmed and empty ones dropped.
    pub fn parse(cash: &str, margin: &str, tickers: &str) -> Result<Self, InputError> {
        let initial_cash = cash
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(|| InputError::InvalidCash(cash.to_string()))?;

        let margin_requirement = margin
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|m| (0.0..=1.0).contains(m))
            .ok_or_else(|| InputError::InvalidMargin(margin.to_string()))?;

        let mut out: Vec<String> = Vec::new();
        for t in tickers.split(',').map(normalize_ticker) {
            if !t.is_empty() && !out.contains(&t) {
                out.push(t);
            }
        }

        Ok(Self {
            initial_cash,
            margin_requirement,
            tickers: out,
        })
    }

    pub fn to_request(&self) -> CreatePortfolioRequest {
        CreatePortfolioRequest {
            initial_cash: self.initial_cash,
            margin_requirement: self.margin_requirement,
            tickers: self.tickers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let i = CreatePortfolioInput::parse(" 100000 ", "0.5", " aapl, MSFT,,  ,aapl ").unwrap();
        assert_eq!(i.initial_cash, 100_000.0);
        assert_eq!(i.margin_requirement, 0.5);
        assert_eq!(i.tickers, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn empty_ticker_list_is_allowed() {
        let i = CreatePortfolioInput::parse("0", "0", "").unwrap();
        assert!(i.tickers.is_empty());
    }

    #[test]
    fn rejects_bad_cash() {
        for bad in ["", "abc", "-1", "inf", "NaN"] {
            assert!(
                matches!(CreatePortfolioInput::parse(bad, "0.5", "AAPL"), Err(InputError::InvalidCash(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_margin() {
        for bad in ["1.5", "-0.1", "half"] {
            assert!(matches!(
                CreatePortfolioInput::parse("100", bad, "AAPL"),
                Err(InputError::InvalidMargin(_))
            ));
        }
    }

    #[test]
    fn cost_bases_must_be_finite_and_non_negative() {
        assert_eq!(validate_update(&PositionUpdate::long("AAPL", 10, 150.0)), Ok(()));
        assert_eq!(validate_update(&PositionUpdate::zeroed("AAPL")), Ok(()));

        let negative = PositionUpdate {
            short_cost_basis: -1.0,
            ..PositionUpdate::zeroed("AAPL")
        };
        assert!(matches!(
            validate_update(&negative),
            Err(InputError::InvalidCostBasis { side: "short", .. })
        ));
        let nan = PositionUpdate::long("AAPL", 1, f64::NAN);
        assert!(matches!(
            validate_update(&nan),
            Err(InputError::InvalidCostBasis { side: "long", .. })
        ));
    }
}
