use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use ahf_client::HttpBackend;
use ahf_dashboard::{PortfolioView, ViewEvent};

type View = PortfolioView<HttpBackend>;

pub async fn run(view: &View, interval_secs: Option<u64>) -> Result<()> {
    view.fetch_portfolio().await?;
    let mut rx = view.subscribe();

    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or(view.settings().poll_interval);
    let poller = view.spawn_price_poller(interval);
    info!(interval_secs = interval.as_secs(), "watching; Ctrl-C to stop");
    view.refresh_chart().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            ev = rx.recv() => match ev {
                Ok(ViewEvent::PortfolioChanged) => {
                    println!("portfolio_changed=true");
                    view.refresh_chart().await;
                }
                Ok(ViewEvent::PricesRefreshed { tickers }) => {
                    println!("prices_refreshed={tickers}");
                    if let Some(t) = view.totals().await {
                        println!(
                            "unrealized_gain={:.2} unrealized_gain_pct={:.2}",
                            t.unrealized_gain, t.unrealized_gain_percent
                        );
                    }
                }
                Ok(ViewEvent::ChartUpdated { source, points }) => {
                    println!("chart source={source:?} points={points}");
                }
                Ok(ViewEvent::Notice { level, message }) => println!("notice={level:?} {message}"),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event bus lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.abort();
    Ok(())
}
