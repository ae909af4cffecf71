//! Single-flight analysis run state machine.
//!
//! ```text
//!   Idle ──Start(k)──► Running(k) ──Complete──► Completed(k)
//!                          │                         │
//!                          └──────Fail──► Failed(k)  │
//!   Completed / Failed ──Start(k')──► Running(k') ◄──┘
//! ```
//!
//! `Start` while `Running` is illegal for any key, which is what limits the
//! whole session to one concurrent analysis.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `(ticker, swarm)` identity of a run; displayed as `ticker-swarm`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub ticker: String,
    pub swarm: String,
}

impl RunKey {
    pub fn new(ticker: impl Into<String>, swarm: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            swarm: swarm.into(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ticker, self.swarm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running(RunKey),
    Completed(RunKey),
    Failed(RunKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Start(RunKey),
    Complete,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal run transition: {from:?} + {event}")]
pub struct TransitionError {
    pub from: RunState,
    pub event: String,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }

    pub fn running_key(&self) -> Option<&RunKey> {
        match self {
            RunState::Running(k) => Some(k),
            _ => None,
        }
    }

    /// The only way state changes. On error the state is left untouched.
    pub fn apply(&mut self, event: RunEvent) -> Result<(), TransitionError> {
        let next = match (&*self, &event) {
            (RunState::Running(_), RunEvent::Start(_)) => None,
            (_, RunEvent::Start(k)) => Some(RunState::Running(k.clone())),
            (RunState::Running(k), RunEvent::Complete) => Some(RunState::Completed(k.clone())),
            (RunState::Running(k), RunEvent::Fail) => Some(RunState::Failed(k.clone())),
            _ => None,
        };

        match next {
            Some(s) => {
                *self = s;
                Ok(())
            }
            None => Err(TransitionError {
                from: self.clone(),
                event: format!("{event:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(t: &str) -> RunKey {
        RunKey::new(t, "Technical Analysis Team")
    }

    #[test]
    fn key_display() {
        assert_eq!(key("AAPL").to_string(), "AAPL-Technical Analysis Team");
    }

    #[test]
    fn second_start_is_rejected_for_any_key() {
        let mut s = RunState::Idle;
        s.apply(RunEvent::Start(key("AAPL"))).unwrap();

        let before = s.clone();
        assert!(s.apply(RunEvent::Start(key("AAPL"))).is_err());
        assert!(s.apply(RunEvent::Start(key("MSFT"))).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn finished_runs_allow_a_new_start() {
        let mut s = RunState::Idle;
        s.apply(RunEvent::Start(key("AAPL"))).unwrap();
        s.apply(RunEvent::Complete).unwrap();
        assert_eq!(s, RunState::Completed(key("AAPL")));
        s.apply(RunEvent::Start(key("MSFT"))).unwrap();
        s.apply(RunEvent::Fail).unwrap();
        assert_eq!(s, RunState::Failed(key("MSFT")));
        assert!(!s.is_running());
        s.apply(RunEvent::Start(key("AAPL"))).unwrap();
        assert_eq!(s.running_key(), Some(&key("AAPL")));
    }

    #[test]
    fn complete_or_fail_without_a_run_is_illegal() {
        let mut s = RunState::Idle;
        assert!(s.apply(RunEvent::Complete).is_err());
        assert!(s.apply(RunEvent::Fail).is_err());
        assert_eq!(s, RunState::Idle);
    }
}
