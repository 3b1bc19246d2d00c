//! Quote flow: rail sources → corridor fee → ranked routes.

use std::sync::Arc;

use railscope::clock::ManualClock;
use railscope::config::AppConfig;
use railscope::engine::{QuoteEngine, QuoteRequest};
use railscope::rails::{RailCandidateSource, StaticRailSource};
use railscope::store::CorridorStore;
use railscope::strategy::Strategy;
use railscope::types::{RailStatus, RailscopeError, SignalInput, SignalSource};

use crate::mock_rails::{candidate, MockRailSource};

fn store() -> Arc<CorridorStore> {
    let clock = Arc::new(ManualClock::new("2024-06-02T00:00:00Z".parse().unwrap()));
    Arc::new(CorridorStore::from_config(&AppConfig::default(), clock).unwrap())
}

fn request(strategy: Strategy, preference: f64) -> QuoteRequest {
    QuoteRequest {
        from: "USD".to_string(),
        to: "INR".to_string(),
        amount: 1_000.0,
        strategy,
        preference,
        limit: None,
    }
}

#[tokio::test]
async fn test_quote_uses_every_source() {
    let a = Arc::new(MockRailSource::new("primary"));
    let b = Arc::new(MockRailSource::with_candidates(
        "secondary",
        vec![
            candidate("rail-c", 0.003, 30.0, 0.6, 0.3, RailStatus::Degraded),
            candidate("rail-d", 0.001, 1.0, 0.99, 0.0, RailStatus::Unavailable),
        ],
    ));
    let sources: Vec<Arc<dyn RailCandidateSource>> = vec![a.clone(), b.clone()];
    let engine = QuoteEngine::new(sources, 5);

    let quote = engine.quote(&request(Strategy::Balanced, 50.0)).await.unwrap();
    let names: Vec<_> = quote.routes.iter().map(|r| r.candidate.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert!(!names.contains(&"rail-d"));
    assert_eq!(a.calls().len(), 1);
    assert_eq!(b.calls()[0].pair.to_string(), "USD/INR");
    assert!(quote.routes.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_failing_source_recovers() {
    let flaky = Arc::new(MockRailSource::new("flaky"));
    let engine = QuoteEngine::new(vec![flaky.clone() as Arc<dyn RailCandidateSource>], 3);

    flaky.set_error("connection reset");
    let err = engine.quote(&request(Strategy::Fast, 50.0)).await.unwrap_err();
    assert!(matches!(err, RailscopeError::RailSource { .. }));

    flaky.clear_error();
    let quote = engine.quote(&request(Strategy::Fast, 50.0)).await.unwrap();
    assert_eq!(quote.routes[0].candidate.name, "rail-b");
}

#[tokio::test]
async fn test_preference_slider_flips_ranking() {
    let engine = QuoteEngine::new(
        vec![Arc::new(MockRailSource::new("primary")) as Arc<dyn RailCandidateSource>],
        3,
    );

    let cost_first = engine.quote(&request(Strategy::Balanced, 0.0)).await.unwrap();
    assert_eq!(cost_first.routes[0].candidate.name, "rail-a");

    let cheap = engine.quote(&request(Strategy::Cheap, 100.0)).await.unwrap();
    assert_eq!(cheap.routes[0].candidate.name, "rail-a");
    assert!(cheap.weights.speed_weight > Strategy::Cheap.preset().speed_weight);
}

#[tokio::test]
async fn test_corridor_signal_raises_quoted_fees() {
    let store = store();
    let engine = QuoteEngine::new(
        vec![Arc::new(MockRailSource::new("primary")) as Arc<dyn RailCandidateSource>],
        3,
    )
    .with_corridor_fees(Arc::clone(&store));

    let calm = engine.quote(&request(Strategy::Cheap, 50.0)).await.unwrap();
    assert_eq!(calm.platform_fee_bps, 70);

    store
        .ingest_signal(SignalInput {
            source: SignalSource::LiquidityDrain,
            corridor: Some("USD/INR".to_string()),
            magnitude: 2.0,
            ttl_seconds: 3600,
            description: Some("Interbank liquidity squeeze".to_string()),
        })
        .await
        .unwrap();

    let stressed = engine.quote(&request(Strategy::Cheap, 50.0)).await.unwrap();
    assert_eq!(stressed.platform_fee_bps, 98);
    let calm_out = calm.routes[0].amount_out.unwrap();
    let stressed_out = stressed.routes[0].amount_out.unwrap();
    assert!(stressed_out < calm_out);
}

#[tokio::test]
async fn test_static_catalogue_quote() {
    let config = AppConfig::default();
    let engine = QuoteEngine::new(
        vec![Arc::new(StaticRailSource::from_config(&config)) as Arc<dyn RailCandidateSource>],
        config.quotes.default_limit,
    );

    let first = engine.quote(&request(Strategy::Safe, 50.0)).await.unwrap();
    let second = engine.quote(&request(Strategy::Safe, 50.0)).await.unwrap();
    assert_eq!(first.routes.len(), 3);
    assert_eq!(first.routes, second.routes);
}
