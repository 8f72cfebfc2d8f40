// tests/pump_test.rs
// Pump-driven behavior: lazy initialization, eligibility emission,
// per-tick repetition, cap/mute suppression, and opportunistic strike
// decay, with the tick driven manually for deterministic clocks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::mpsc;

use herald::config::CoverageConfig;
use herald::coverage::sqlite::SqliteCoverageStore;
use herald::coverage::types::{CandidateItem, CandidateSource, Momentum};
use herald::engine::CoverageEngine;
use herald::registry::{DestinationPolicy, DestinationRegistry};

fn policy(id: &str) -> DestinationPolicy {
    DestinationPolicy {
        id: id.to_string(),
        room_name: format!("#{id}"),
        platform: "discord".to_string(),
        cadence_override_ms: None,
        source_filter: None,
        default_style: None,
    }
}

struct StaticCandidates(Vec<CandidateItem>);

#[async_trait]
impl CandidateSource for StaticCandidates {
    async fn candidates(&self) -> Vec<CandidateItem> {
        self.0.clone()
    }
}

fn no_candidates() -> Arc<StaticCandidates> {
    Arc::new(StaticCandidates(Vec::new()))
}

async fn setup(policies: Vec<DestinationPolicy>) -> Arc<CoverageEngine> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");

    let backend = Arc::new(SqliteCoverageStore::new(pool));
    backend.init_schema().await.expect("schema bootstrap");

    let registry = Arc::new(DestinationRegistry::load(policies).expect("valid registry"));
    let engine = Arc::new(CoverageEngine::new(
        CoverageConfig::default(),
        registry,
        backend,
    ));
    engine.hydrate().await.expect("hydrate");
    engine
}

#[tokio::test]
async fn tick_lazily_initializes_and_emits() {
    let engine = setup(vec![policy("general")]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);

    let eligible = pump.run_once(Utc::now()).await;

    assert_eq!(eligible, 1);
    let gap = rx.try_recv().expect("one gap signal");
    assert_eq!(gap.destination_id, "general");

    // The fresh record was persisted during the tick.
    let state = engine.coverage_state("general").await.expect("lazy state");
    assert_eq!(state.mention_count_24h, 0);
    assert!(state.last_mention_at.is_none());
}

#[tokio::test]
async fn eligible_room_fires_every_tick_until_mentioned() {
    let engine = setup(vec![policy("general")]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    let now = Utc::now();

    pump.run_once(now).await;
    pump.run_once(now + Duration::minutes(30)).await;
    assert_eq!(rx.try_recv().unwrap().destination_id, "general");
    assert_eq!(rx.try_recv().unwrap().destination_id, "general");

    // Once a broadcast lands, cadence silences the room again.
    let mentioned = now + Duration::minutes(31);
    engine.record_mention("general", mentioned).await.unwrap();
    pump.run_once(mentioned + Duration::minutes(30)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn capped_room_is_not_emitted() {
    let engine = setup(vec![policy("general")]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    let now = Utc::now();

    // 15 mentions inside the window; the last one 3h ago so cadence (2h)
    // has elapsed and only the cap can be the blocker.
    let first = now - Duration::hours(4);
    for i in 0..15 {
        engine
            .record_mention("general", first + Duration::minutes(i))
            .await
            .unwrap();
    }

    let eligible = pump.run_once(now).await;
    assert_eq!(eligible, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn muted_room_is_not_emitted() {
    let engine = setup(vec![policy("general")]).await;
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    let now = Utc::now();

    engine.record_feedback("general", "stop", now).await.unwrap();
    engine.record_feedback("general", "spam", now).await.unwrap();

    let eligible = pump.run_once(now + Duration::hours(1)).await;
    assert_eq!(eligible, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn breaking_candidate_compresses_cadence() {
    let engine = setup(vec![policy("general")]).await;
    let now = Utc::now();
    // Mentioned 1h ago, cadence 2h: normally too soon.
    engine.record_mention("general", now - Duration::hours(1)).await.unwrap();

    let hot = Arc::new(StaticCandidates(vec![CandidateItem {
        momentum: Momentum::Growing,
        confidence: 0.9,
    }]));
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(hot, tx);
    assert_eq!(pump.run_once(now).await, 1);
    assert_eq!(rx.try_recv().unwrap().destination_id, "general");

    // A lukewarm candidate does not open the gate.
    let lukewarm = Arc::new(StaticCandidates(vec![CandidateItem {
        momentum: Momentum::Growing,
        confidence: 0.5,
    }]));
    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(lukewarm, tx);
    assert_eq!(pump.run_once(now).await, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn quiet_room_decays_one_strike_per_tick() {
    let engine = setup(vec![policy("general")]).await;
    let now = Utc::now();

    // One strike, last broadcast 49h ago: past the 48h decay window.
    engine.record_mention("general", now - Duration::hours(49)).await.unwrap();
    engine
        .record_feedback("general", "too much", now - Duration::hours(49))
        .await
        .unwrap();
    assert_eq!(engine.coverage_state("general").await.unwrap().strikes, 1);

    let (tx, _rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    pump.run_once(now).await;

    assert_eq!(engine.coverage_state("general").await.unwrap().strikes, 0);
}

#[tokio::test]
async fn decay_is_gated_on_mention_recency() {
    let engine = setup(vec![policy("general")]).await;
    let now = Utc::now();

    // Strikes but no recorded broadcast at all: nothing to measure
    // quietness from, so nothing decays.
    engine.record_feedback("general", "annoying", now - Duration::hours(72)).await.unwrap();

    let (tx, _rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    pump.run_once(now).await;
    assert_eq!(engine.coverage_state("general").await.unwrap().strikes, 1);

    // A recent broadcast also blocks decay.
    engine.record_mention("general", now - Duration::hours(1)).await.unwrap();
    pump.run_once(now).await;
    assert_eq!(engine.coverage_state("general").await.unwrap().strikes, 1);
}

#[tokio::test]
async fn tick_visits_every_room_independently() {
    // Two rooms; one of them eligible, the other muted. The sweep must
    // always visit both regardless of individual outcomes.
    let engine = setup(vec![policy("general"), policy("news")]).await;
    let now = Utc::now();

    engine.record_feedback("news", "stop", now).await.unwrap();
    engine.record_feedback("news", "spam", now).await.unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let pump = engine.build_pump(no_candidates(), tx);
    let eligible = pump.run_once(now).await;

    assert_eq!(eligible, 1);
    assert_eq!(rx.try_recv().unwrap().destination_id, "general");
    assert!(rx.try_recv().is_err());
}
