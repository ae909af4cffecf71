use anyhow::{bail, Result};
use tokio::sync::broadcast::error::RecvError;

use ahf_client::HttpBackend;
use ahf_dashboard::{PortfolioView, ViewEvent};
use ahf_schemas::AnalysisStatus;

type View = PortfolioView<HttpBackend>;

pub async fn run(view: &View, ticker: &str, team: &str) -> Result<()> {
    view.fetch_portfolio().await?;

    let mut rx = view.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ViewEvent::Progress(p)) => println!(
                    "progress={} done={}/{} {}",
                    p.progress,
                    p.completed_agents.len(),
                    p.total_agents,
                    p.current_agent
                ),
                Ok(ViewEvent::ResultWritten { .. }) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    });

    let result = view.run_analysis(ticker, team).await;
    if result.is_ok() {
        let _ = printer.await;
    } else {
        // rejected before starting: no ResultWritten will arrive
        printer.abort();
    }
    let result = result?;

    println!("run_id={}", result.run_id.map(|u| u.to_string()).unwrap_or_default());
    println!("status={:?}", result.status);
    if result.status == AnalysisStatus::Error {
        bail!(
            "analysis failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(d) = result.decision() {
        println!(
            "decision={:?} quantity={} confidence={:.0}",
            d.action, d.quantity, d.confidence
        );
        println!("reasoning={}", d.reasoning);
    }
    if let Some(a) = result.detailed_analysis.as_ref() {
        for (agent, by_ticker) in &a.analyst_signals {
            if let Some(s) = by_ticker.get(&result.ticker) {
                let signal = s.signal.map(|x| format!("{x:?}")).unwrap_or_else(|| "-".into());
                let confidence = s
                    .confidence
                    .map(|c| format!("{c:.0}"))
                    .unwrap_or_else(|| "-".into());
                println!("{agent} signal={signal} confidence={confidence}");
            }
        }
    }
    Ok(())
}
