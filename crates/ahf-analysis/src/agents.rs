//! Analyst teams.
//!
//! Each team is one authoritative list of `(selection_id, progress_id)`
//! pairs. The selection id is what the run request names in
//! `selected_agents`; the progress id is what the backend reports in
//! progress frames. Both directions are derived from the same pairs, so the
//! two views cannot drift. Note the mapping is not a suffix rule:
//! `sentiment_analyst` reports as `sentiment_agent`.

/// Agents that report progress on every run but are never user-selected.
pub const INFRA_AGENTS: [&str; 2] = ["risk_management_agent", "portfolio_manager"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    pub name: &'static str,
    pub members: &'static [(&'static str, &'static str)],
}

impl Team {
    /// Identifiers sent as `selected_agents`, in team order.
    pub fn selected_agents(&self) -> Vec<&'static str> {
        self.members.iter().map(|(sel, _)| *sel).collect()
    }

    /// Identifiers expected in progress frames: team members, then the
    /// infrastructure agents.
    pub fn expected_progress_agents(&self) -> Vec<&'static str> {
        self.members
            .iter()
            .map(|(_, prog)| *prog)
            .chain(INFRA_AGENTS)
            .collect()
    }

    /// Reverse lookup: backend progress id -> selection id (members only).
    pub fn selection_for_progress_id(&self, progress_id: &str) -> Option<&'static str> {
        self.members
            .iter()
            .find(|(_, prog)| *prog == progress_id)
            .map(|(sel, _)| *sel)
    }

    pub fn expects(&self, progress_id: &str) -> bool {
        self.members.iter().any(|(_, prog)| *prog == progress_id) || is_infra_agent(progress_id)
    }
}

pub fn is_infra_agent(id: &str) -> bool {
    INFRA_AGENTS.contains(&id)
}

const WARREN_BUFFETT: (&str, &str) = ("warren_buffett", "warren_buffett_agent");
const CHARLIE_MUNGER: (&str, &str) = ("charlie_munger", "charlie_munger_agent");
const BEN_GRAHAM: (&str, &str) = ("ben_graham", "ben_graham_agent");
const CATHIE_WOOD: (&str, &str) = ("cathie_wood", "cathie_wood_agent");
const PHIL_FISHER: (&str, &str) = ("phil_fisher", "phil_fisher_agent");
const PETER_LYNCH: (&str, &str) = ("peter_lynch", "peter_lynch_agent");
const MICHAEL_BURRY: (&str, &str) = ("michael_burry", "michael_burry_agent");
const BILL_ACKMAN: (&str, &str) = ("bill_ackman", "bill_ackman_agent");
const STANLEY_DRUCKENMILLER: (&str, &str) =
    ("stanley_druckenmiller", "stanley_druckenmiller_agent");
const TECHNICAL: (&str, &str) = ("technical_analyst", "technical_analyst_agent");
const SENTIMENT: (&str, &str) = ("sentiment_analyst", "sentiment_agent");
const FUNDAMENTALS: (&str, &str) = ("fundamentals_analyst", "fundamentals_agent");
const VALUATION: (&str, &str) = ("valuation_analyst", "valuation_agent");

pub const TEAMS: &[Team] = &[
    Team {
        name: "Value Investors Team",
        members: &[WARREN_BUFFETT, CHARLIE_MUNGER, BEN_GRAHAM],
    },
    Team {
        name: "Growth Investors Team",
        members: &[CATHIE_WOOD, PHIL_FISHER, PETER_LYNCH],
    },
    Team {
        name: "Contrarian Team",
        members: &[MICHAEL_BURRY, BILL_ACKMAN],
    },
    Team {
        name: "Macro Team",
        members: &[STANLEY_DRUCKENMILLER],
    },
    Team {
        name: "Technical Analysis Team",
        members: &[TECHNICAL, SENTIMENT],
    },
    Team {
        name: "Fundamental Analysis Team",
        members: &[FUNDAMENTALS, VALUATION],
    },
    Team {
        name: "Full Team",
        members: &[
            WARREN_BUFFETT,
            CHARLIE_MUNGER,
            BEN_GRAHAM,
            CATHIE_WOOD,
            PHIL_FISHER,
            PETER_LYNCH,
            MICHAEL_BURRY,
            BILL_ACKMAN,
            STANLEY_DRUCKENMILLER,
            TECHNICAL,
            SENTIMENT,
            FUNDAMENTALS,
            VALUATION,
        ],
    },
];

/// Exact name first, then case-insensitive.
pub fn find_team(name: &str) -> Option<&'static Team> {
    let name = name.trim();
    TEAMS
        .iter()
        .find(|t| t.name == name)
        .or_else(|| TEAMS.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
}

/// Human-readable label for a selection or progress id.
pub fn agent_label(id: &str) -> String {
    match id {
        "risk_management_agent" => return "Risk Manager".to_string(),
        "portfolio_manager" => return "Portfolio Manager".to_string(),
        _ => {}
    }
    let base = id.strip_suffix("_agent").unwrap_or(id);
    base.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_ascii_uppercase().to_string() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
