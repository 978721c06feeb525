//! # Storage Retry
//!
//! Bounded exponential backoff around ledger-db calls.
//!
//! Only transient faults are retried (see
//! [`DbError::is_transient`](ledger_db::DbError::is_transient)): a writer
//! that waited out the busy timeout, an exhausted pool, a dropped
//! connection. Rule refusals and missing rows return immediately. Each
//! attempt is a whole transaction, so a retry never sees half of a failed
//! one.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use ledger_db::DbResult;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Adds up to 25 % to each backoff.
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;

        let mut duration = Duration::from_millis(backoff_ms);
        if self.add_jitter {
            let jitter = (backoff_ms as f64 * 0.25 * jitter_fraction()) as u64;
            duration += Duration::from_millis(jitter);
        }
        duration
    }
}

/// Cheap 0.0..1.0 value from the clock's sub-second nanos.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Runs `f` until it succeeds, fails permanently, or the budget runs out.
///
/// ```ignore
/// let invoice = with_retry(&policy, "mark_sent", || db.invoices().mark_sent(id)).await?;
/// ```
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut f: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempt = attempt + 1, "Storage call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let backoff = policy.backoff_duration(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "Transient storage fault, retrying after backoff"
                );
                sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    warn!(operation, attempts = attempt + 1, error = %err, "Storage retries exhausted");
                }
                return Err(err);
            }
        }
    }
}
