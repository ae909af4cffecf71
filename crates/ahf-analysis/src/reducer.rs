//! Pure reduction of progress events into [`AnalysisProgress`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agents::Team;
use crate::estimate::estimate_progress;
use crate::events::ProgressEvent;
use crate::run_state::RunKey;

/// Live progress of one in-flight run, keyed by `ticker-swarm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisProgress {
    pub key: String,
    /// `"{agent}: {status}"` of the latest event.
    pub current_agent: String,
    /// Selection ids that reported `Done`, in completion order.
    pub completed_agents: Vec<String>,
    /// Selected agents only; infrastructure agents are not counted.
    pub total_agents: usize,
    pub progress: u8,
    /// backend agent id -> that agent's own estimate
    pub agent_progresses: BTreeMap<String, u8>,
}

impl AnalysisProgress {
    pub fn new(key: &RunKey, team: &Team) -> Self {
        Self {
            key: key.to_string(),
            current_agent: "Starting analysis".to_string(),
            completed_agents: Vec::new(),
            total_agents: team.members.len(),
            progress: 0,
            agent_progresses: BTreeMap::new(),
        }
    }

    pub fn mark_complete(&mut self) {
        self.progress = 100;
        self.current_agent = "Analysis complete".to_string();
    }
}

/// Apply one progress event.
///
/// Overall progress is
/// `round(sum(expected agents' estimates) / max(expected agents reported, total_agents))`.
/// The denominator never drops below the selected-agent count, so progress
/// cannot reach 100 before every selected agent has reported; it does rise
/// past that floor once infrastructure agents report too.
pub fn reduce(progress: &mut AnalysisProgress, team: &Team, event: &ProgressEvent) {
    progress.current_agent = format!("{}: {}", event.agent, event.status);

    let estimate = estimate_progress(&event.agent, &event.status);
    progress
        .agent_progresses
        .insert(event.agent.clone(), estimate);

    if event.status == "Done" {
        if let Some(selection) = team.selection_for_progress_id(&event.agent) {
            if !progress.completed_agents.iter().any(|a| a == selection) {
                progress.completed_agents.push(selection.to_string());
            }
        }
    }

    let (sum, reported) = team
        .expected_progress_agents()
        .iter()
        .filter_map(|id| progress.agent_progresses.get(*id))
        .fold((0u32, 0usize), |(s, n), v| (s + u32::from(*v), n + 1));

    let denominator = reported.max(progress.total_agents);
    progress.progress = if denominator == 0 {
        0
    } else {
        (f64::from(sum) / denominator as f64).round().min(100.0) as u8
    };
}
