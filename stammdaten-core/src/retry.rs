//! Retry policy for the pre-flight health check.
//!
//! The store never retries regular operations; only the read-only health
//! check runs under this policy, and only for transient-looking failures.
//! The policy is configuration, not hard-coded sleeps, so tests run it
//! with zero delay.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::BackendPort;
use crate::error::{StoreError, StoreResult};

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

/// Bounded exponential backoff: `base_delay_ms * 2^attempt`
/// (1 s, 2 s with the defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy without backoff delays, for tests.
    pub fn no_delay(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 0,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

/// Read-only backend health check: list the tabs, retrying only
/// transient failures and stopping immediately on permission or
/// missing-document errors.
pub async fn health_check(
    backend: &dyn BackendPort,
    policy: &RetryPolicy,
) -> StoreResult<Vec<String>> {
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match backend.list_tabs().await {
            Ok(tabs) => return Ok(tabs),
            Err(err) if err.is_transient() => {
                warn!(attempt, error = %err, "health check attempt failed");
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay(attempt)).await;
        }
    }

    Err(last_error
        .unwrap_or_else(|| StoreError::TransientFailure("health check never ran".into())))
}
