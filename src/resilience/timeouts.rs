//! Timeout enforcement for store calls and whole requests.
//!
//! Every call into the store gets a deadline, and so does every request.
//! A timed-out future is dropped, which cancels whatever it was awaiting,
//! and surfaces as a distinct error the HTTP layer reports as 503.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// An operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{operation} timed out after {after:?}")]
pub struct Elapsed {
    pub operation: &'static str,
    pub after: Duration,
}

/// Run `fut` with a deadline.
pub async fn with_deadline<F, T>(operation: &'static str, after: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut).await.map_err(|_| {
        tracing::warn!(operation, timeout = ?after, "Operation exceeded deadline");
        Elapsed { operation, after }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result = with_deadline("slow", Duration::from_secs(3), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            42
        })
        .await;

        assert_eq!(
            result,
            Err(Elapsed {
                operation: "slow",
                after: Duration::from_secs(3)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_passes_through() {
        let result = with_deadline("fast", Duration::from_secs(3), async { 42 }).await;
        assert_eq!(result, Ok(42));
    }
}
