use crate::DbError;
use chrono::{DateTime, SecondsFormat, Utc};
use core_types::{NewObservation, ObservationFilter, RawObservation};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{FromRow, SqlitePool};

/// Every column is read back as text so that malformed values reach the
/// accessor (and its skip tally) instead of failing the whole fetch.
const SELECT_RAW_OBSERVATIONS: &str = r#"
    SELECT
        id,
        source,
        symbol,
        asset_class,
        CAST(event_time AS TEXT) AS event_time,
        CAST(price AS TEXT) AS price,
        currency,
        CAST(ingest_time AS TEXT) AS ingest_time,
        content_checksum
    FROM observations
    WHERE (?1 IS NULL OR symbol = ?1)
      AND (?2 IS NULL OR source = ?2)
    ORDER BY id ASC
"#;

const INSERT_OBSERVATION: &str = r#"
    INSERT OR IGNORE INTO observations
        (source, symbol, asset_class, event_time, price, currency, source_file, ingest_time, content_checksum)
    VALUES
        (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?8, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')), ?9)
"#;

/// Row count per (source, symbol) series.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SeriesCount {
    pub source: String,
    pub symbol: String,
    pub row_count: i64,
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the ledger. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetches ledger rows matching the text-level part of `filter` (symbol
    /// and source), in insertion order.
    ///
    /// The read runs in a single transaction so every downstream computation
    /// sees one consistent snapshot even while a writer appends. The time
    /// range is NOT applied here: stored timestamps are only comparable once
    /// parsed.
    pub async fn fetch_raw_observations(
        &self,
        filter: &ObservationFilter,
    ) -> Result<Vec<RawObservation>, DbError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, RawObservation>(SELECT_RAW_OBSERVATIONS)
            .bind(filter.symbol.as_deref())
            .bind(filter.source.as_deref())
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(rows = rows.len(), ?filter, "Fetched ledger snapshot.");
        Ok(rows)
    }

    /// Lists every (source, symbol) series with its row count.
    pub async fn get_series_counts(&self) -> Result<Vec<SeriesCount>, DbError> {
        let counts = sqlx::query_as::<_, SeriesCount>(
            "SELECT source, symbol, COUNT(*) AS row_count FROM observations GROUP BY source, symbol ORDER BY symbol, source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Saves a single normalized observation.
    ///
    /// Uses `INSERT OR IGNORE` against the (source, symbol, event_time)
    /// constraint, so re-inserting the same record is a no-op. Returns
    /// whether a row was written. `ingest_time` defaults to the database
    /// clock.
    pub async fn save_observation(
        &self,
        observation: &NewObservation,
        ingest_time: Option<DateTime<Utc>>,
    ) -> Result<bool, DbError> {
        let ingest_time = ingest_time.map(format_ingest_time);
        let result = insert_observation(observation, ingest_time.as_deref())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Saves a batch of observations within a single transaction for
    /// atomicity. Returns how many rows were actually inserted.
    pub async fn save_observations(
        &self,
        observations: &[NewObservation],
        ingest_time: Option<DateTime<Utc>>,
    ) -> Result<u64, DbError> {
        let ingest_time = ingest_time.map(format_ingest_time);
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for observation in observations {
            let result = insert_observation(observation, ingest_time.as_deref())
                .execute(&mut *tx) // Note: must use the transaction object `tx` here
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        tracing::info!(inserted, offered = observations.len(), "Saved observations.");
        Ok(inserted)
    }
}

fn format_ingest_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn insert_observation<'q>(
    observation: &'q NewObservation,
    ingest_time: Option<&'q str>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    sqlx::query(INSERT_OBSERVATION)
        .bind(&observation.source)
        .bind(&observation.symbol)
        .bind(&observation.asset_class)
        .bind(&observation.event_time)
        .bind(observation.price)
        .bind(observation.currency.as_deref())
        .bind(observation.source_file.as_deref())
        .bind(ingest_time)
        .bind(observation.checksum())
}
