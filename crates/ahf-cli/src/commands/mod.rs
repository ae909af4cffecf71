pub mod analyze;
pub mod market;
pub mod portfolio;
pub mod watch;

use ahf_analysis::TEAMS;

pub fn print_teams() {
    for team in TEAMS {
        println!("{}: {}", team.name, team.selected_agents().join(", "));
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}
