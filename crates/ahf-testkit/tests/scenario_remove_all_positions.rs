//! Scenario: confirm-gated bulk removal.
//!
//! Declined -> zero PUT calls. Confirmed -> exactly one PUT whose
//! `positions` array has one zeroed entry per active ticker.

use std::sync::Arc;

use ahf_client::HttpBackend;
use ahf_config::ApiConfig;
use ahf_dashboard::{AlwaysConfirm, NeverConfirm, PortfolioView, ViewError, ViewSettings};
use ahf_portfolio::CreatePortfolioInput;
use ahf_schemas::PositionUpdate;
use ahf_testkit::{spawn_mock, MockState, Route};

#[tokio::test]
async fn remove_all_is_one_zeroed_put_per_active_ticker() {
    let server = spawn_mock(MockState::new()).await.unwrap();
    let view = PortfolioView::new(
        Arc::new(HttpBackend::new(ApiConfig::explicit(&server.base_url))),
        ViewSettings::default(),
    );

    let input = CreatePortfolioInput::parse("100000", "0.5", "AAPL,MSFT,IDLE").unwrap();
    view.create_portfolio(&input).await.unwrap();
    view.update_position(PositionUpdate::long("AAPL", 10, 150.0))
        .await
        .unwrap();
    view.update_position(PositionUpdate::long("MSFT", 3, 300.0))
        .await
        .unwrap();
    let puts_before = server.state.hits(Route::Positions).await;

    assert_eq!(
        view.remove_all_positions(&NeverConfirm).await,
        Err(ViewError::Declined)
    );
    assert_eq!(server.state.hits(Route::Positions).await, puts_before);
    assert!(view.portfolio().await.unwrap().has_active_positions());

    let p = view.remove_all_positions(&AlwaysConfirm).await.unwrap();
    assert_eq!(server.state.hits(Route::Positions).await, puts_before + 1);

    let sent = server.state.last_positions.read().await.clone();
    assert_eq!(
        sent,
        vec![PositionUpdate::zeroed("AAPL"), PositionUpdate::zeroed("MSFT")]
    );
    assert!(!p.has_active_positions());
    assert_eq!(p.positions.len(), 3);
}
