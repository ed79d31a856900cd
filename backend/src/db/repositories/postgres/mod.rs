//! Postgres repository implementation using Diesel.
//!
//! Implements the repository traits against the `programs` /
//! `program_intervals` tables. Integrity checks are plain read-only SQL
//! statements issued with [`diesel::sql_query`]; the interval table is kept in
//! step by the database trigger, so writes only ever touch `programs`.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Optional bootstrap migration for development databases
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
//! - `PG_RUN_MIGRATIONS`: Create tables, function and trigger on startup (default: false)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::query_builder::SqlQuery;
use diesel::query_dsl::LoadQuery;
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, IntegrityRepository, ProgramRepository, RepositoryError, RepositoryResult,
};
use crate::models::{
    DuplicateName, ExcessiveDuration, IntervalMismatch, LongName, OverlappingPair, Program,
    ProgramId, ProgramInterval, ProgramTimes, TimeOfDay,
};
use crate::services::rules::{MAX_DURATION_MINUTES, MAX_NAME_LENGTH, SUSPICIOUS_NAME_PATTERNS};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
    /// Run the bootstrap migration when the repository is created
    pub run_migrations: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
            run_migrations: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    /// - `PG_RUN_MIGRATIONS`: `true`/`1`/`yes` to run the bootstrap migration
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_parse("PG_POOL_MAX").unwrap_or(defaults.max_pool_size),
            min_pool_size: env_parse("PG_POOL_MIN").unwrap_or(defaults.min_pool_size),
            connection_timeout_sec: env_parse("PG_CONN_TIMEOUT_SEC")
                .unwrap_or(defaults.connection_timeout_sec),
            idle_timeout_sec: env_parse("PG_IDLE_TIMEOUT_SEC")
                .unwrap_or(defaults.idle_timeout_sec),
            max_retries: env_parse("PG_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: env_parse("PG_RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            run_migrations: env_flag("PG_RUN_MIGRATIONS").unwrap_or(defaults.run_migrations),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository over a pooled Postgres connection.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Build the pool, running the bootstrap migration if configured.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        if config.run_migrations {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection(
                    e.to_string(),
                    ErrorContext::new("run_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations").with_table("programs"),
            )
        })?;
        log::info!("Applied {} pending migration(s)", applied.len());

        Ok(())
    }

    /// Run `f` on a pooled connection off the async runtime, retrying
    /// retryable failures up to `max_retries` times with doubling delay.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    log::debug!("Retrying database operation (attempt {})", attempt + 1);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        log::warn!("Database operation failed after {} attempt(s): {}", attempt + 1, e);
                        return Err(e);
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal(
                    "Retries exhausted with no error captured",
                    ErrorContext::new("with_conn"),
                )
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Run a parameter-free read and return the raw rows.
    async fn load_rows<R>(&self, operation: &'static str, query: String) -> RepositoryResult<Vec<R>>
    where
        R: Send + 'static,
        SqlQuery: for<'a> LoadQuery<'a, PgConnection, R>,
    {
        self.with_conn(move |conn| {
            sql_query(query)
                .load::<R>(conn)
                .map_err(|e| map_diesel_error(e).with_operation(operation))
        })
        .await
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn time_param(time: Option<TimeOfDay>) -> Option<String> {
    time.map(|t| t.to_string())
}

const PROGRAM_TIMES_COLUMNS: &str =
    "program_name, start_time::text AS start_time, end_time::text AS end_time";

// `id` is widened so that SERIAL (int4) tables decode as well as BIGSERIAL ones.
const INSERT_PROGRAM_SQL: &str = "INSERT INTO programs (program_name, start_time, end_time) \
     VALUES ($1, CAST($2 AS TIME), CAST($3 AS TIME)) RETURNING id::bigint AS id";

fn list_programs_query() -> String {
    format!(
        "SELECT id::bigint AS id, {PROGRAM_TIMES_COLUMNS} FROM programs \
         ORDER BY program_name NULLS FIRST, id"
    )
}

fn suspicious_names_query() -> String {
    let patterns = SUSPICIOUS_NAME_PATTERNS
        .iter()
        .map(|p| format!("'%{}%'", p))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT program_name FROM programs \
         WHERE program_name ILIKE ANY(ARRAY[{patterns}]) \
         ORDER BY id"
    )
}

#[async_trait]
impl ProgramRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_program(
        &self,
        program_name: Option<&str>,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
    ) -> RepositoryResult<ProgramId> {
        let name = program_name.map(str::to_string);
        let start = time_param(start_time);
        let end = time_param(end_time);
        self.with_conn(move |conn| {
            sql_query(INSERT_PROGRAM_SQL)
                .bind::<Nullable<Text>, _>(name)
                .bind::<Nullable<Text>, _>(start)
                .bind::<Nullable<Text>, _>(end)
                .get_result::<IdRow>(conn)
                .map(|row| ProgramId(row.id))
                .map_err(|e| map_diesel_error(e).with_operation("insert_program"))
        })
        .await
    }

    async fn update_program_times(
        &self,
        program_name: &str,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> RepositoryResult<u64> {
        let name = program_name.to_string();
        let start = start_time.to_string();
        let end = end_time.to_string();
        self.with_conn(move |conn| {
            sql_query(
                "UPDATE programs SET start_time = CAST($2 AS TIME), end_time = CAST($3 AS TIME) \
                 WHERE program_name = $1",
            )
            .bind::<Text, _>(name)
            .bind::<Text, _>(start)
            .bind::<Text, _>(end)
            .execute(conn)
            .map(|n| n as u64)
            .map_err(|e| map_diesel_error(e).with_operation("update_program_times"))
        })
        .await
    }

    async fn rename_program(&self, old_name: &str, new_name: &str) -> RepositoryResult<u64> {
        let old_name = old_name.to_string();
        let new_name = new_name.to_string();
        self.with_conn(move |conn| {
            diesel::update(programs::table.filter(programs::program_name.eq(&old_name)))
                .set(programs::program_name.eq(&new_name))
                .execute(conn)
                .map(|n| n as u64)
                .map_err(|e| map_diesel_error(e).with_operation("rename_program"))
        })
        .await
    }

    async fn delete_program(&self, program_name: &str) -> RepositoryResult<u64> {
        let name = program_name.to_string();
        self.with_conn(move |conn| {
            diesel::delete(programs::table.filter(programs::program_name.eq(&name)))
                .execute(conn)
                .map(|n| n as u64)
                .map_err(|e| map_diesel_error(e).with_operation("delete_program"))
        })
        .await
    }

    async fn list_programs(&self) -> RepositoryResult<Vec<Program>> {
        let rows = self
            .load_rows::<ProgramRow>("list_programs", list_programs_query())
            .await?;
        decode_rows(rows)
    }

    async fn list_program_intervals(&self) -> RepositoryResult<Vec<ProgramInterval>> {
        self.with_conn(|conn| {
            program_intervals::table
                .order(program_intervals::program_name.asc())
                .select(ProgramIntervalRow::as_select())
                .load::<ProgramIntervalRow>(conn)
                .map(|rows| rows.into_iter().map(ProgramInterval::from).collect())
                .map_err(|e| map_diesel_error(e).with_operation("list_program_intervals"))
        })
        .await
    }

    async fn get_program_interval(
        &self,
        program_name: &str,
    ) -> RepositoryResult<Vec<ProgramInterval>> {
        let name = program_name.to_string();
        self.with_conn(move |conn| {
            program_intervals::table
                .filter(program_intervals::program_name.eq(&name))
                .select(ProgramIntervalRow::as_select())
                .load::<ProgramIntervalRow>(conn)
                .map(|rows| rows.into_iter().map(ProgramInterval::from).collect())
                .map_err(|e| map_diesel_error(e).with_operation("get_program_interval"))
        })
        .await
    }

    async fn clear_programs(&self) -> RepositoryResult<()> {
        self.with_conn(|conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(program_intervals::table).execute(conn)?;
                diesel::delete(programs::table).execute(conn)?;
                Ok(())
            })
            .map_err(|e| {
                RepositoryError::transaction(
                    e.to_string(),
                    ErrorContext::new("clear_programs").with_table("program_intervals"),
                )
            })
        })
        .await
    }
}

#[async_trait]
impl IntegrityRepository for PostgresRepository {
    async fn fetch_orphaned_interval_names(&self) -> RepositoryResult<Vec<String>> {
        let rows = self
            .load_rows::<NameRow>(
                "fetch_orphaned_interval_names",
                "SELECT pi.program_name FROM program_intervals pi \
                 LEFT JOIN programs p ON pi.program_name = p.program_name \
                 WHERE p.program_name IS NULL \
                 ORDER BY pi.program_name"
                    .to_string(),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.program_name).collect())
    }

    async fn fetch_programs_missing_intervals(&self) -> RepositoryResult<Vec<Option<String>>> {
        let rows = self
            .load_rows::<NullableNameRow>(
                "fetch_programs_missing_intervals",
                "SELECT p.program_name FROM programs p \
                 LEFT JOIN program_intervals pi ON p.program_name = pi.program_name \
                 WHERE pi.program_name IS NULL \
                 ORDER BY p.id"
                    .to_string(),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.program_name).collect())
    }

    async fn fetch_programs_with_invalid_times(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        let rows = self.load_rows::<ProgramTimesRow>(
            "fetch_programs_with_invalid_times",
            format!(
                "SELECT {PROGRAM_TIMES_COLUMNS} FROM programs \
                 WHERE start_time IS NULL OR end_time IS NULL \
                    OR start_time::text = '' OR end_time::text = '' \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_overlapping_programs(&self) -> RepositoryResult<Vec<OverlappingPair>> {
        let rows = self.load_rows::<OverlapRow>(
            "fetch_overlapping_programs",
            "SELECT p1.program_name AS program1, p2.program_name AS program2, \
                    p1.start_time::text AS start1, p1.end_time::text AS end1, \
                    p2.start_time::text AS start2, p2.end_time::text AS end2 \
             FROM programs p1 \
             JOIN programs p2 ON p1.id < p2.id \
             WHERE p1.start_time < p2.end_time \
               AND p1.end_time > p2.start_time \
               AND NOT (p1.start_time > p1.end_time OR p2.start_time > p2.end_time) \
             ORDER BY p1.id, p2.id"
                .to_string(),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_negative_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        let rows = self.load_rows::<ProgramTimesRow>(
            "fetch_negative_duration_programs",
            format!(
                "SELECT {PROGRAM_TIMES_COLUMNS} FROM programs \
                 WHERE start_time > end_time \
                   AND NOT (start_time > TIME '12:00' AND end_time < TIME '12:00') \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_interval_mismatches(&self) -> RepositoryResult<Vec<IntervalMismatch>> {
        let rows = self.load_rows::<MismatchRow>(
            "fetch_interval_mismatches",
            "SELECT p.program_name, p.start_time::text AS start_time, \
                    p.end_time::text AS end_time, \
                    pi.interval_count AS stored_count, \
                    count_15min_intervals(p.start_time, p.end_time) AS calculated_count \
             FROM programs p \
             JOIN program_intervals pi ON p.program_name = pi.program_name \
             WHERE pi.interval_count != count_15min_intervals(p.start_time, p.end_time) \
             ORDER BY p.id"
                .to_string(),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_duplicate_names(&self) -> RepositoryResult<Vec<DuplicateName>> {
        let rows = self
            .load_rows::<DuplicateRow>(
                "fetch_duplicate_names",
                "SELECT program_name, COUNT(*) AS count FROM programs \
                 GROUP BY program_name \
                 HAVING COUNT(*) > 1 \
                 ORDER BY program_name NULLS FIRST"
                    .to_string(),
            )
            .await?;
        Ok(rows.into_iter().map(DuplicateName::from).collect())
    }

    async fn fetch_programs_with_empty_names(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        let rows = self.load_rows::<ProgramTimesRow>(
            "fetch_programs_with_empty_names",
            format!(
                "SELECT {PROGRAM_TIMES_COLUMNS} FROM programs \
                 WHERE program_name IS NULL \
                    OR program_name !~ '\\S' \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_long_names(&self) -> RepositoryResult<Vec<LongName>> {
        let rows = self
            .load_rows::<LongNameRow>(
                "fetch_long_names",
                format!(
                    "SELECT program_name, LENGTH(program_name) AS name_length FROM programs \
                     WHERE LENGTH(program_name) > {MAX_NAME_LENGTH} \
                     ORDER BY id"
                ),
            )
            .await?;
        Ok(rows.into_iter().map(LongName::from).collect())
    }

    async fn fetch_zero_duration_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        let rows = self.load_rows::<ProgramTimesRow>(
            "fetch_zero_duration_programs",
            format!(
                "SELECT {PROGRAM_TIMES_COLUMNS} FROM programs \
                 WHERE start_time = end_time \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_programs_exceeding_day(&self) -> RepositoryResult<Vec<ExcessiveDuration>> {
        let rows = self.load_rows::<ExcessiveDurationRow>(
            "fetch_programs_exceeding_day",
            format!(
                "SELECT program_name, start_time::text AS start_time, \
                        end_time::text AS end_time, duration_minutes \
                 FROM ( \
                     SELECT id, program_name, start_time, end_time, \
                            (CASE \
                                WHEN end_time < start_time THEN \
                                    EXTRACT(EPOCH FROM (TIME '24:00:00' - start_time)) + \
                                    EXTRACT(EPOCH FROM end_time) \
                                ELSE \
                                    EXTRACT(EPOCH FROM (end_time - start_time)) \
                             END / 60)::float8 AS duration_minutes \
                     FROM programs \
                     WHERE start_time IS NOT NULL AND end_time IS NOT NULL \
                 ) durations \
                 WHERE duration_minutes > {MAX_DURATION_MINUTES} \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }

    async fn fetch_suspicious_names(&self) -> RepositoryResult<Vec<String>> {
        let rows = self
            .load_rows::<NameRow>("fetch_suspicious_names", suspicious_names_query())
            .await?;
        Ok(rows.into_iter().map(|r| r.program_name).collect())
    }

    async fn fetch_non_standard_time_programs(&self) -> RepositoryResult<Vec<ProgramTimes>> {
        let rows = self.load_rows::<ProgramTimesRow>(
            "fetch_non_standard_time_programs",
            format!(
                "SELECT {PROGRAM_TIMES_COLUMNS} FROM programs \
                 WHERE EXTRACT(MINUTE FROM start_time) NOT IN (0, 15, 30, 45) \
                    OR EXTRACT(MINUTE FROM end_time) NOT IN (0, 15, 30, 45) \
                 ORDER BY id"
            ),
        )
        .await?;
        decode_rows(rows)
    }
}
