//! ahf-testkit
//!
//! In-process stand-in for the hedge-fund backend, used by the scenario
//! tests under `tests/`. It follows the real backend's portfolio semantics
//! (404 before create, full-replace position updates that create missing
//! tickers) and replays a scripted SSE body for `/hedge-fund/run`, split
//! into arbitrary chunk sizes.
//!
//! Every route counts its hits so tests can assert "no network call".

pub mod mock_backend;

pub use mock_backend::{build_router, spawn_mock, MockServer, MockState, Route, RunScript};
