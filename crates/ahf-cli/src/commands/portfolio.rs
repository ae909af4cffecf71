use anyhow::{bail, Result};

use ahf_client::HttpBackend;
use ahf_dashboard::{PortfolioView, ViewError};
use ahf_portfolio::CreatePortfolioInput;
use ahf_schemas::{Portfolio, PositionUpdate};

use super::fmt_opt;
use crate::prompt::confirmer;

type View = PortfolioView<HttpBackend>;

pub async fn show(view: &View) -> Result<()> {
    view.fetch_portfolio().await?;
    print_portfolio(view).await
}

pub async fn create(view: &View, cash: &str, margin: &str, tickers: &str) -> Result<()> {
    // Validation fails before any request is made.
    let input = CreatePortfolioInput::parse(cash, margin, tickers)?;
    view.create_portfolio(&input).await?;
    println!("created=true");
    print_portfolio(view).await
}

pub async fn set(
    view: &View,
    ticker: &str,
    long: u64,
    long_cost: f64,
    short: u64,
    short_cost: f64,
) -> Result<()> {
    let update = PositionUpdate {
        long_shares: long,
        short_shares: short,
        long_cost_basis: long_cost,
        short_cost_basis: short_cost,
        ..PositionUpdate::zeroed(ticker)
    };
    view.update_position(update).await?;
    print_portfolio(view).await
}

pub async fn remove(view: &View, ticker: &str, yes: bool) -> Result<()> {
    let confirm = confirmer(yes);
    match view.remove_position(ticker, confirm.as_ref()).await {
        Err(ViewError::Declined) => {
            println!("declined=true");
            Ok(())
        }
        Err(e) => Err(e.into()),
        Ok(_) => print_portfolio(view).await,
    }
}

pub async fn remove_all(view: &View, yes: bool) -> Result<()> {
    view.fetch_portfolio().await?;
    let confirm = confirmer(yes);
    match view.remove_all_positions(confirm.as_ref()).await {
        Err(ViewError::Declined) => {
            println!("declined=true");
            Ok(())
        }
        Err(e) => Err(e.into()),
        Ok(_) => print_portfolio(view).await,
    }
}

async fn print_portfolio(view: &View) -> Result<()> {
    let Some(summary) = view.summary().await else {
        bail!("no portfolio loaded");
    };
    println!(
        "cash={:.2} margin_requirement={:.2} margin_used={:.2}",
        summary.cash, summary.margin_requirement, summary.margin_used
    );
    println!(
        "total_long_value={:.2} total_short_value={:.2} total_portfolio_value={:.2} positions={}",
        summary.total_long_value,
        summary.total_short_value,
        summary.total_portfolio_value,
        summary.positions_count
    );

    for m in view.holding_metrics().await {
        println!(
            "{} long={} short={} value={:.2} price={} gain={} gain_pct={}",
            m.ticker,
            m.long,
            m.short,
            m.position_value,
            fmt_opt(m.current_price),
            fmt_opt(m.unrealized_gain),
            fmt_opt(m.unrealized_gain_percent),
        );
    }
    if let Some(p) = view.portfolio().await {
        print_inactive(&p);
    }
    Ok(())
}

fn print_inactive(p: &Portfolio) {
    let idle: Vec<&str> = p
        .positions
        .iter()
        .filter(|(_, pos)| !pos.is_active())
        .map(|(t, _)| t.as_str())
        .collect();
    if !idle.is_empty() {
        println!("watchlist={}", idle.join(","));
    }
}
