use ahf_client::ClientError;
use ahf_portfolio::{InputError, UnknownPeriod};

/// A second analysis was requested while one is in flight.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("analysis already running for {running}")]
pub struct RunRejected {
    /// `ticker-swarm` of the run in flight.
    pub running: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Backend(#[from] ClientError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Period(#[from] UnknownPeriod),
    #[error(transparent)]
    Rejected(#[from] RunRejected),
    #[error("action declined")]
    Declined,
    #[error("no portfolio loaded")]
    NoPortfolio,
    #[error("unknown analyst team {0:?}")]
    UnknownTeam(String),
    #[error("{0} has no active position")]
    NotEligible(String),
}
