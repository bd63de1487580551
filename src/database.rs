//! Shared database plumbing: per-call timeout and pool construction.

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::configuration::DatabaseSettings;
use crate::error::{AppError, DatabaseError};

/// Upper bound for a single data-access call.
pub const DB_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a query future, abandoning it after [`DB_TIMEOUT`].
///
/// A timeout says nothing about whether the statement took effect.
pub async fn with_timeout<T, F>(fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(DB_TIMEOUT, fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            tracing::warn!(timeout_secs = DB_TIMEOUT.as_secs(), "Database call timed out");
            Err(AppError::Database(DatabaseError::Timeout))
        }
    }
}

/// Lazily connecting pool; connections are opened on first use.
pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(DB_TIMEOUT)
        .connect_lazy_with(settings.with_db())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_results() {
        let ok = with_timeout(async { Ok::<_, sqlx::Error>(5) }).await.unwrap();
        assert_eq!(ok, 5);

        let err = with_timeout(async { Err::<i32, _>(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(err, Err(AppError::Database(DatabaseError::NotFound(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result = with_timeout(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;

        match result {
            Err(e) => assert!(e.is_transient()),
            Ok(_) => panic!("expected a timeout"),
        }
    }
}
