// src/coverage/sqlite.rs
// SQLite-backed coverage persistence. One row per room, timestamps stored
// as unix milliseconds.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::debug;

use super::store::CoverageBackend;
use super::types::CoverageState;

pub struct SqliteCoverageStore {
    pub pool: SqlitePool,
}

impl SqliteCoverageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Bootstrap the schema. Idempotent.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coverage_state (
                destination_id    TEXT PRIMARY KEY,
                room_name         TEXT NOT NULL,
                platform          TEXT NOT NULL,
                last_mention_at   INTEGER,
                mention_count_24h INTEGER NOT NULL DEFAULT 0,
                cadence_ms        INTEGER NOT NULL,
                strikes           INTEGER NOT NULL DEFAULT 0,
                muted_until       INTEGER,
                inferred_topics   TEXT,
                idle_since        INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("coverage_state schema ready");
        Ok(())
    }
}

fn millis(ts: &Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_millis())
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(|v| Utc.timestamp_millis_opt(v).single())
}

fn row_to_state(row: &SqliteRow) -> CoverageState {
    CoverageState {
        destination_id: row.get("destination_id"),
        room_name: row.get("room_name"),
        platform: row.get("platform"),
        last_mention_at: from_millis(row.get("last_mention_at")),
        mention_count_24h: row.get::<i64, _>("mention_count_24h") as u32,
        cadence_ms: row.get("cadence_ms"),
        strikes: row.get::<i64, _>("strikes") as u32,
        muted_until: from_millis(row.get("muted_until")),
        inferred_topics: row.get("inferred_topics"),
        idle_since: from_millis(row.get("idle_since")),
    }
}

#[async_trait]
impl CoverageBackend for SqliteCoverageStore {
    async fn load_all(&self) -> Result<Vec<CoverageState>> {
        let rows = sqlx::query("SELECT * FROM coverage_state")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_state).collect())
    }

    async fn upsert(&self, state: &CoverageState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO coverage_state (
                destination_id, room_name, platform, last_mention_at,
                mention_count_24h, cadence_ms, strikes, muted_until,
                inferred_topics, idle_since
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(destination_id) DO UPDATE SET
                room_name         = excluded.room_name,
                platform          = excluded.platform,
                last_mention_at   = excluded.last_mention_at,
                mention_count_24h = excluded.mention_count_24h,
                cadence_ms        = excluded.cadence_ms,
                strikes           = excluded.strikes,
                muted_until       = excluded.muted_until,
                inferred_topics   = excluded.inferred_topics,
                idle_since        = excluded.idle_since
            "#,
        )
        .bind(&state.destination_id)
        .bind(&state.room_name)
        .bind(&state.platform)
        .bind(millis(&state.last_mention_at))
        .bind(state.mention_count_24h as i64)
        .bind(state.cadence_ms)
        .bind(state.strikes as i64)
        .bind(millis(&state.muted_until))
        .bind(&state.inferred_topics)
        .bind(millis(&state.idle_since))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
