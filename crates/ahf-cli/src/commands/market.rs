use anyhow::Result;

use ahf_client::HttpBackend;
use ahf_dashboard::PortfolioView;
use ahf_portfolio::ChartPeriod;

use super::fmt_opt;

type View = PortfolioView<HttpBackend>;

pub async fn prices(view: &View) -> Result<()> {
    view.fetch_portfolio().await?;
    let n = view.refresh_prices().await?;
    println!("prices_refreshed={n}");
    for m in view.holding_metrics().await {
        println!(
            "{} price={} change={} change_pct={}",
            m.ticker,
            fmt_opt(m.current_price),
            fmt_opt(m.price_change),
            fmt_opt(m.price_change_percent),
        );
    }
    if let Some(t) = view.totals().await {
        println!(
            "unrealized_gain={:.2} unrealized_gain_pct={:.2} unpriced={}",
            t.unrealized_gain, t.unrealized_gain_percent, t.unpriced_positions
        );
    }
    Ok(())
}

pub async fn history(view: &View, period: Option<ChartPeriod>) -> Result<()> {
    view.fetch_portfolio().await?;
    let period = period.unwrap_or(view.settings().default_period);
    let Some(series) = view.set_period(period).await else {
        anyhow::bail!("no portfolio loaded");
    };
    println!(
        "period={} source={:?} points={}",
        series.period,
        series.source,
        series.points.len()
    );
    for p in &series.points {
        println!(
            "{} total={:.2} cash={:.2} positions={:.2} unrealized={:.2}",
            p.date, p.total_value, p.cash, p.positions_value, p.unrealized_gains
        );
    }
    Ok(())
}

pub async fn holdings(view: &View, period: Option<ChartPeriod>) -> Result<()> {
    let period = period.unwrap_or(view.settings().default_period);
    let data = view.holdings_data(period).await?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
