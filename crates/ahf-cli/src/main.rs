use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ahf_client::HttpBackend;
use ahf_config::{ApiConfig, Settings};
use ahf_dashboard::{PortfolioView, ViewSettings};
use ahf_portfolio::ChartPeriod;

mod commands;
mod prompt;

#[derive(Parser)]
#[command(name = "ahf")]
#[command(about = "AI hedge fund portfolio console", long_about = None)]
struct Cli {
    /// Backend base URL; overrides AHF_DEV / AHF_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Settings YAML, repeatable; later files override earlier ones
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Portfolio commands
    Portfolio {
        #[command(subcommand)]
        cmd: PortfolioCmd,
    },

    /// Refresh real-time prices for the active positions
    Prices,

    /// Print the portfolio value history
    History {
        /// 1mo | 3mo | 6mo | 1y (default from settings)
        #[arg(long)]
        period: Option<ChartPeriod>,
    },

    /// Dump the backend holdings snapshot as JSON
    Holdings {
        #[arg(long)]
        period: Option<ChartPeriod>,
    },

    /// Stream one analysis run and print the decision
    Analyze {
        #[arg(long)]
        ticker: String,

        /// Analyst team name (see `ahf teams`)
        #[arg(long)]
        team: String,
    },

    /// List analyst teams and their agents
    Teams,

    /// Keep prices and chart fresh, printing view events until Ctrl-C
    Watch {
        /// Poll interval override in seconds
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
enum PortfolioCmd {
    /// Fetch and print the portfolio
    Show,

    /// Create the portfolio
    Create {
        #[arg(long)]
        cash: String,

        /// Fraction in [0, 1]
        #[arg(long, default_value = "0.5")]
        margin: String,

        /// Comma-separated tickers
        #[arg(long, default_value = "")]
        tickers: String,
    },

    /// Set a position (full replace, not increment)
    Set {
        ticker: String,

        #[arg(long, default_value_t = 0)]
        long: u64,

        #[arg(long, default_value_t = 0.0)]
        long_cost: f64,

        #[arg(long, default_value_t = 0)]
        short: u64,

        #[arg(long, default_value_t = 0.0)]
        short_cost: f64,
    },

    /// Zero one position. Prompts unless --yes.
    Remove {
        ticker: String,

        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Zero every active position. Prompts unless --yes.
    RemoveAll {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    // Offline: no backend, no settings.
    if let Commands::Teams = cli.cmd {
        commands::print_teams();
        return Ok(());
    }

    let settings = load_settings(&cli.config_paths)?;
    let view_settings =
        ViewSettings::from_settings(&settings).context("invalid chart.default_period")?;

    let api = match cli.api_url.as_deref() {
        Some(url) => ApiConfig::explicit(url),
        None => ApiConfig::from_env(),
    };
    info!(base_url = %api.base_url, source = %api.source, "backend resolved");

    let view = PortfolioView::new(Arc::new(HttpBackend::new(api)), view_settings);

    match cli.cmd {
        Commands::Portfolio { cmd } => match cmd {
            PortfolioCmd::Show => commands::portfolio::show(&view).await,
            PortfolioCmd::Create {
                cash,
                margin,
                tickers,
            } => commands::portfolio::create(&view, &cash, &margin, &tickers).await,
            PortfolioCmd::Set {
                ticker,
                long,
                long_cost,
                short,
                short_cost,
            } => commands::portfolio::set(&view, &ticker, long, long_cost, short, short_cost).await,
            PortfolioCmd::Remove { ticker, yes } => {
                commands::portfolio::remove(&view, &ticker, yes).await
            }
            PortfolioCmd::RemoveAll { yes } => commands::portfolio::remove_all(&view, yes).await,
        },
        Commands::Prices => commands::market::prices(&view).await,
        Commands::History { period } => commands::market::history(&view, period).await,
        Commands::Holdings { period } => commands::market::holdings(&view, period).await,
        Commands::Analyze { ticker, team } => commands::analyze::run(&view, &ticker, &team).await,
        Commands::Watch { interval_secs } => commands::watch::run(&view, interval_secs).await,
        Commands::Teams => Ok(()),
    }
}

fn load_settings(paths: &[String]) -> Result<Settings> {
    if paths.is_empty() {
        return Ok(Settings::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let settings = ahf_config::load_layered_yaml(&path_refs)?;
    info!(layers = paths.len(), "settings loaded");
    Ok(settings)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
