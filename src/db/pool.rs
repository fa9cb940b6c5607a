//! Connection pool construction with retry/backoff (spec §7:
//! `db_unavailable` is retried with exponential backoff, max 3 attempts,
//! base 1s, during long pipelines — the teacher's graceful-degradation
//! style generalized into an actual retry loop).

use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, PgSslMode};
use sqlx::ConnectOptions;

use crate::config::ResolvedDatabase;
use crate::error::StrataError;

/// Deadline applied to every database execution (spec §5): 60s default.
pub const DB_EXECUTION_DEADLINE: Duration = Duration::from_secs(60);

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Connect with exponential backoff: attempt 1 immediate, attempt 2 after
/// 1s, attempt 3 after 2s. Gives up and surfaces `DbUnavailable` after
/// `MAX_ATTEMPTS` failures.
pub async fn connect_with_retry(db: &ResolvedDatabase) -> Result<sqlx::PgPool, StrataError> {
    let mut last_err: Option<sqlx::Error> = None;

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
            tracing::warn!(
                "database connection attempt {} failed, retrying in {:?}",
                attempt,
                backoff
            );
            tokio::time::sleep(backoff).await;
        }

        let options = sqlx::postgres::PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name)
            .ssl_mode(PgSslMode::Prefer)
            .disable_statement_logging();

        match PgPoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => last_err = Some(e),
        }
    }

    Err(StrataError::DbUnavailable(format!(
        "could not connect to {}:{} after {} attempts: {}",
        db.host,
        db.port,
        MAX_ATTEMPTS,
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}
