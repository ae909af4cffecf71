//! ahf-dashboard
//!
//! The portfolio view session: one [`PortfolioView`] owns the local
//! portfolio copy, the result store, live analysis progress and the chart
//! series, and is the only writer of any of them.
//!
//! - controller: fetch / create / update / confirm-gated removal
//! - price poller: periodic real-time price refresh
//! - chart: history series for the selected period
//! - runner: single-flight streamed analysis
//!
//! Observers subscribe to [`ViewEvent`]s on a broadcast bus.

mod confirm;
mod error;
mod poller;
mod runner;
mod state;
mod view;

#[cfg(test)]
mod fake;

pub use confirm::{AlwaysConfirm, Confirm, NeverConfirm};
pub use error::{RunRejected, ViewError};
pub use poller::PRICE_PERIOD;
pub use runner::NO_RESULT;
pub use state::{NoticeLevel, ViewEvent, ViewSettings, ViewState};
pub use view::PortfolioView;
