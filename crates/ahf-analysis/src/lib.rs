//! ahf-analysis
//!
//! Everything needed to turn a streamed hedge-fund run into state, with the
//! I/O kept at the edge:
//!
//! - `sse`: byte chunks -> complete lines -> typed frames
//! - `events`: the typed async event sequence consumed by the runner
//! - `agents`: analyst teams and their backend progress identifiers
//! - `estimate`: `(agent, status)` -> 0..=100 milestone lookup
//! - `reducer`: pure [`reduce`] over [`AnalysisProgress`]
//! - `run_state`: the single-flight run state machine
//!
//! Nothing here touches the network or a clock.

pub mod agents;
pub mod estimate;
pub mod events;
pub mod reducer;
pub mod run_state;
pub mod sse;

pub use agents::{agent_label, find_team, is_infra_agent, Team, INFRA_AGENTS, TEAMS};
pub use estimate::{estimate_progress, AgentCategory};
pub use events::{event_stream, ProgressEvent, StreamEvent};
pub use reducer::{reduce, AnalysisProgress};
pub use run_state::{RunEvent, RunKey, RunState, TransitionError};
pub use sse::{parse_frame, Frame, LineDecoder};
