//! Per-agent progress estimate.
//!
//! The backend reports free-text statuses, not percentages. Each agent
//! category has a milestone table of known statuses; lookup precedence is
//! exact match, then substring match (table order), then keyword fallback.
//! Every table ends at `"Done" => 100`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentCategory {
    Contrarian,
    Technical,
    Sentiment,
    Risk,
    PortfolioManager,
    Default,
}

const CONTRARIAN_AGENTS: &[&str] = &["michael_burry_agent", "bill_ackman_agent"];

const CONTRARIAN: &[(&str, u8)] = &[
    ("Fetching financial metrics", 10),
    ("Fetching insider trades", 25),
    ("Fetching company news", 35),
    ("Analyzing value", 50),
    ("Analyzing balance sheet", 60),
    ("Analyzing insider activity", 70),
    ("Analyzing contrarian sentiment", 80),
    ("Generating LLM output", 90),
    ("Done", 100),
];

const TECHNICAL: &[(&str, u8)] = &[
    ("Fetching price data", 20),
    ("Calculating trend signals", 40),
    ("Calculating mean reversion", 55),
    ("Calculating momentum", 70),
    ("Analyzing volatility", 80),
    ("Statistical analysis", 85),
    ("Combining signals", 90),
    ("Done", 100),
];

const SENTIMENT: &[(&str, u8)] = &[
    ("Fetching insider trades", 20),
    ("Analyzing trading patterns", 40),
    ("Fetching company news", 60),
    ("Combining signals", 80),
    ("Done", 100),
];

const RISK: &[(&str, u8)] = &[
    ("Fetching price data", 30),
    ("Analyzing price data", 50),
    ("Calculating position limits", 80),
    ("Done", 100),
];

const PORTFOLIO_MANAGER: &[(&str, u8)] = &[
    ("Processing analyst signals", 25),
    ("Making trading decisions", 60),
    ("Generating trading decisions", 80),
    ("Done", 100),
];

const DEFAULT: &[(&str, u8)] = &[
    ("Fetching financial metrics", 10),
    ("Gathering financial line items", 20),
    ("Getting market cap", 30),
    ("Fetching insider trades", 35),
    ("Fetching company news", 40),
    ("Done", 100),
];

impl AgentCategory {
    pub fn classify(agent: &str) -> Self {
        let a = agent.to_ascii_lowercase();
        if a.contains("portfolio") {
            AgentCategory::PortfolioManager
        } else if a.contains("risk") {
            AgentCategory::Risk
        } else if a.contains("technical") {
            AgentCategory::Technical
        } else if a.contains("sentiment") {
            AgentCategory::Sentiment
        } else if a.contains("contrarian") || CONTRARIAN_AGENTS.contains(&a.as_str()) {
            AgentCategory::Contrarian
        } else {
            AgentCategory::Default
        }
    }

    pub fn milestones(&self) -> &'static [(&'static str, u8)] {
        match self {
            AgentCategory::Contrarian => CONTRARIAN,
            AgentCategory::Technical => TECHNICAL,
            AgentCategory::Sentiment => SENTIMENT,
            AgentCategory::Risk => RISK,
            AgentCategory::PortfolioManager => PORTFOLIO_MANAGER,
            AgentCategory::Default => DEFAULT,
        }
    }
}

/// 0..=100 estimate for one agent's status string.
pub fn estimate_progress(agent: &str, status: &str) -> u8 {
    let table = AgentCategory::classify(agent).milestones();
    let status = status.trim();

    if let Some((_, v)) = table.iter().find(|(k, _)| *k == status) {
        return *v;
    }
    if let Some((_, v)) = table.iter().find(|(k, _)| status.contains(k)) {
        return *v;
    }
    keyword_fallback(status)
}

fn keyword_fallback(status: &str) -> u8 {
    const KEYWORDS: &[(&str, u8)] = &[
        ("Fetching", 20),
        ("Analyzing", 50),
        ("Calculating", 70),
        ("Generating", 90),
        ("Done", 100),
    ];
    KEYWORDS
        .iter()
        .find(|(k, _)| status.contains(k))
        .map(|(_, v)| *v)
        .unwrap_or(10)
}
