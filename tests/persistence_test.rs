// tests/persistence_test.rs
// Durability across restarts: a second engine over the same database file
// must hydrate exactly what the first one persisted.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use herald::config::CoverageConfig;
use herald::coverage::sqlite::SqliteCoverageStore;
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

async fn engine_for(path: &std::path::Path) -> Arc<CoverageEngine> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .expect("options")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("open sqlite file");

    let backend = Arc::new(SqliteCoverageStore::new(pool));
    backend.init_schema().await.expect("schema bootstrap");

    let registry =
        Arc::new(DestinationRegistry::load(vec![policy("general"), policy("news")]).unwrap());
    let engine = Arc::new(CoverageEngine::new(
        CoverageConfig::default(),
        registry,
        backend,
    ));
    engine.hydrate().await.expect("hydrate");
    engine
}

#[tokio::test]
async fn state_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("herald.db");
    let now = Utc::now();

    {
        let engine = engine_for(&db_path).await;
        engine.record_mention("general", now - Duration::hours(1)).await.unwrap();
        engine.record_mention("general", now).await.unwrap();
        engine.record_feedback("general", "stop", now).await.unwrap();
        engine.record_feedback("general", "spam", now).await.unwrap();
    }

    let engine = engine_for(&db_path).await;
    let state = engine.coverage_state("general").await.expect("hydrated state");

    assert_eq!(state.mention_count_24h, 2);
    assert_eq!(state.strikes, 2);
    assert_eq!(
        state.last_mention_at.unwrap().timestamp_millis(),
        now.timestamp_millis()
    );
    assert_eq!(
        state.muted_until.unwrap().timestamp_millis(),
        (now + Duration::hours(24)).timestamp_millis()
    );

    // Rooms never touched stay absent.
    assert!(engine.coverage_state("news").await.is_none());
}
