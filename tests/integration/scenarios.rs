//! End-to-end corridor and ranking scenarios.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

use railscope::clock::ManualClock;
use railscope::config::AppConfig;
use railscope::engine::rank;
use railscope::store::CorridorStore;
use railscope::strategy::{resolve, Strategy, NEUTRAL_PREFERENCE};
use railscope::types::{CurrencyPair, RailscopeError, SignalInput, SignalSource};

use crate::mock_rails::MockRailSource;

/// Sunday 2024-06-02 00:00 UTC: no weekday watch window is open.
fn sunday() -> DateTime<Utc> {
    "2024-06-02T00:00:00Z".parse().unwrap()
}

fn store_at(start: DateTime<Utc>) -> (Arc<CorridorStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start));
    let store = CorridorStore::from_config(&AppConfig::default(), clock.clone()).unwrap();
    (Arc::new(store), clock)
}

/// Monday 2024-06-03 03:30 UTC = 09:00 IST.
fn monday_rbi_open() -> DateTime<Utc> {
    "2024-06-03T03:30:00Z".parse().unwrap()
}

/// Default corridors with the RBI pre-open watch on USD/INR.
fn windowed_store_at(start: DateTime<Utc>) -> Arc<CorridorStore> {
    let config = AppConfig::from_toml_str(
        r#"
        [[corridors]]
        pair = "USD/INR"
        max_adj_bps = 40

        [[corridors.windows]]
        label = "RBI pre-open watch"
        utc_offset_minutes = 330
        start = "08:30"
        end = "10:30"
        days = [1, 2, 3, 4, 5]
        boost_bps = 5.0
        risk_weight = 1.25

        [[corridors]]
        pair = "USD/PKR"
        max_adj_bps = 60

        [[corridors]]
        pair = "GBP/INR"
        max_adj_bps = 50
        "#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(start));
    Arc::new(CorridorStore::from_config(&config, clock).unwrap())
}

fn pair(s: &str) -> CurrencyPair {
    s.parse().unwrap()
}

fn signal(source: SignalSource, corridor: Option<&str>, magnitude: f64, ttl_seconds: u64) -> SignalInput {
    SignalInput {
        source,
        corridor: corridor.map(str::to_string),
        magnitude,
        ttl_seconds,
        description: None,
    }
}

fn snapshot_json(store: &CorridorStore) -> String {
    serde_json::to_string(&*store.get_states()).unwrap()
}

#[tokio::test]
async fn test_invalid_signals_leave_every_state_unchanged() {
    let (store, _) = store_at(sunday());
    store.seed_preset_signals().await.unwrap();
    let before = snapshot_json(&store);

    for bad in [
        signal(SignalSource::Manual, Some("USD/INR"), -0.1, 3600),
        signal(SignalSource::Manual, Some("USD/INR"), 2.5, 3600),
        signal(SignalSource::Manual, Some("USD/INR"), 1.0, 30),
        signal(SignalSource::Manual, Some("JPY/KRW"), 1.0, 3600),
    ] {
        let err = store.ingest_signal(bad).await.unwrap_err();
        assert!(matches!(err, RailscopeError::Validation(_)), "{err}");
    }

    assert_eq!(snapshot_json(&store), before);
}

#[tokio::test]
async fn test_rbi_signal_decays_to_baseline() {
    let (store, clock) = store_at(sunday());
    let usd_inr = pair("USD/INR");
    assert_ok!(
        store
            .ingest_signal(signal(SignalSource::RbiIntervention, Some("USD/INR"), 1.0, 3600))
            .await
    );

    // min(source weight 12, corridor cap 40)
    assert_eq!(store.get_state(&usd_inr).unwrap().suggested_adj_bps, 12);

    clock.advance_secs(1800);
    store.tick().await.unwrap();
    assert_eq!(store.get_state(&usd_inr).unwrap().suggested_adj_bps, 6);

    clock.advance_secs(1800);
    store.tick().await.unwrap();
    let state = store.get_state(&usd_inr).unwrap();
    assert_eq!(state.suggested_adj_bps, 0);
    assert!(state.active_signals.is_empty());
    assert!(!state.in_sensitive_window);
}

#[tokio::test]
async fn test_default_config_decay_ignores_time_of_day() {
    let (store, clock) = store_at(monday_rbi_open());
    let usd_inr = pair("USD/INR");
    store
        .ingest_signal(signal(SignalSource::RbiIntervention, Some("USD/INR"), 1.0, 3600))
        .await
        .unwrap();

    let state = store.get_state(&usd_inr).unwrap();
    assert_eq!(state.suggested_adj_bps, 12);
    // 12 / 40 pulled a quarter of the way to 1 by the high-impact source
    assert!((state.risk_score - (0.3 + 0.7 * 0.25)).abs() < 1e-12);

    clock.advance_secs(1800);
    store.tick().await.unwrap();
    assert_eq!(store.get_state(&usd_inr).unwrap().suggested_adj_bps, 6);

    clock.advance_secs(1800);
    store.tick().await.unwrap();
    assert_eq!(store.get_state(&usd_inr).unwrap().suggested_adj_bps, 0);
}

#[tokio::test]
async fn test_expired_signal_leaves_others_contributing() {
    let (store, clock) = store_at(sunday());
    let usd_inr = pair("USD/INR");
    store
        .ingest_signal(signal(SignalSource::RbiIntervention, Some("USD/INR"), 1.0, 600))
        .await
        .unwrap();
    store
        .ingest_signal(signal(SignalSource::MarketVol, Some("USD/INR"), 1.0, 7200))
        .await
        .unwrap();

    clock.advance_secs(600);
    store.tick().await.unwrap();
    let state = store.get_state(&usd_inr).unwrap();
    assert_eq!(state.active_signals.len(), 1);
    // 10 × (1 − 600/7200) = 9.17
    assert_eq!(state.suggested_adj_bps, 9);
}

#[tokio::test]
async fn test_caps_hold_under_signal_flood() {
    let (store, _) = store_at(sunday());
    for _ in 0..20 {
        store
            .ingest_signal(signal(SignalSource::LiquidityDrain, None, 2.0, 3600))
            .await
            .unwrap();
    }

    let caps = [("GBP/INR", 50), ("USD/INR", 40), ("USD/PKR", 60)];
    for (p, cap) in caps {
        let state = store.get_state(&pair(p)).unwrap();
        assert_eq!(state.suggested_adj_bps, cap);
        assert_eq!(state.risk_score, 1.0);
        assert!(state.in_sensitive_window);
    }
}

#[tokio::test]
async fn test_all_signal_is_shared_not_copied() {
    let (store, _) = store_at(sunday());
    store
        .ingest_signal(signal(SignalSource::SpreadWidening, Some("all"), 1.0, 3600))
        .await
        .unwrap();

    let states = store.get_states();
    assert!(states.iter().all(|s| s.suggested_adj_bps == 11));
    assert!(Arc::ptr_eq(&states[0].active_signals[0], &states[2].active_signals[0]));
}

#[tokio::test]
async fn test_clear_resets_every_corridor() {
    let (store, _) = store_at(sunday());
    store.seed_preset_signals().await.unwrap();
    store
        .ingest_signal(signal(SignalSource::Manual, None, 1.0, 3600))
        .await
        .unwrap();

    assert_eq!(store.clear_all_signals().await.unwrap(), 4);
    for state in store.get_states().iter() {
        assert_eq!(state.suggested_adj_bps, 0);
        assert_eq!(state.risk_score, 0.0);
        assert!(state.active_signals.is_empty());
        assert!(!state.in_sensitive_window);
        assert_eq!(state.total_fee_bps, state.base_fee_bps);
    }
}

#[tokio::test]
async fn test_clear_holds_baseline_inside_watch_window() {
    let store = windowed_store_at(monday_rbi_open());
    store.seed_preset_signals().await.unwrap();
    store.clear_all_signals().await.unwrap();

    let state = store.get_state(&pair("USD/INR")).unwrap();
    assert_eq!(state.suggested_adj_bps, 0);
    assert!(!state.in_sensitive_window);
}

#[tokio::test]
async fn test_watch_window_boosts_active_corridor() {
    let store = windowed_store_at(monday_rbi_open());
    store
        .ingest_signal(signal(SignalSource::MarketVol, Some("USD/INR"), 1.0, 3600))
        .await
        .unwrap();

    let state = store.get_state(&pair("USD/INR")).unwrap();
    // 10 bps from the signal + 5 bps window boost
    assert_eq!(state.suggested_adj_bps, 15);
    assert!((state.risk_score - 15.0 / 40.0 * 1.25).abs() < 1e-12);
    assert!(state.in_sensitive_window);
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let (store, _) = store_at(sunday());
    store.seed_preset_signals().await.unwrap();

    let a = store.get_states();
    let b = store.get_states();
    assert_eq!(*a, *b);
    assert_eq!(snapshot_json(&store), snapshot_json(&store));
}

#[tokio::test]
async fn test_subscriber_sees_changes_only() {
    let (store, clock) = store_at(sunday());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _sub = store.subscribe_fn(move |states| {
        let _ = tx.send(states);
    });

    store
        .ingest_signal(signal(SignalSource::UpiUkPolicy, Some("GBP/INR"), 1.0, 3600))
        .await
        .unwrap();
    let states = rx.recv().await.unwrap();
    assert_eq!(states[0].suggested_adj_bps, 6);

    // Nothing decays far enough in one second to move a rounded bps value.
    clock.advance_secs(1);
    assert!(!store.tick().await.unwrap());
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv())
        .await
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingests_are_serialised() {
    let (store, _) = store_at(sunday());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .ingest_signal(signal(SignalSource::Manual, None, 0.1, 3600))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for state in store.get_states().iter() {
        assert_eq!(state.active_signals.len(), 16);
        // 16 × 0.1 × 5 = 8
        assert_eq!(state.suggested_adj_bps, 8);
    }
}

#[test]
fn test_strategy_changes_the_winner() {
    let candidates = MockRailSource::default_candidates();

    let cheap = rank(&candidates, &resolve(Strategy::Cheap, NEUTRAL_PREFERENCE));
    assert_eq!(cheap[0].candidate.name, "rail-a");

    let fast = rank(&candidates, &resolve(Strategy::Fast, NEUTRAL_PREFERENCE));
    assert_eq!(fast[0].candidate.name, "rail-b");

    let balanced = rank(&candidates, &Strategy::Balanced.preset());
    assert!(balanced[0].score >= balanced[1].score);
}

#[test]
fn test_empty_candidates_rank_to_empty() {
    assert!(rank(&[], &Strategy::Safe.preset()).is_empty());
}
