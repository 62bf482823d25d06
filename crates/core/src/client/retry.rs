//! Transient-failure absorption for service calls
//!
//! Throttling and unknown-resource answers are part of normal operation
//! against the hosted service; both are absorbed here with a bounded
//! sleep so call sites stay straight-line code.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::ServiceError;

/// Delays applied while absorbing transient errors
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Sleep after a throttling answer
    pub throttle_delay: Duration,

    /// Sleep after an unknown-resource answer
    pub race_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            throttle_delay: Duration::from_secs(5),
            race_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Millisecond-scale delays for tests
    pub fn fast() -> Self {
        Self {
            throttle_delay: Duration::from_millis(5),
            race_delay: Duration::from_millis(5),
        }
    }
}

/// Run `op` until it answers something other than `Throttling` or
/// `UnknownResource`. Other errors propagate to the caller.
pub async fn call_with_retries<T, F, Fut>(
    config: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(ServiceError::Throttling) => {
                warn!(op = what, "throttled, backing off");
                tokio::time::sleep(config.throttle_delay).await;
            }
            Err(ServiceError::UnknownResource) => {
                warn!(op = what, "unknown resource, retrying");
                tokio::time::sleep(config.race_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run a registration call, treating `AlreadyExists` as success
pub async fn ensure_registered<Fut>(what: &str, op: Fut) -> Result<(), ServiceError>
where
    Fut: Future<Output = Result<(), ServiceError>>,
{
    match op.await {
        Ok(()) => Ok(()),
        Err(ServiceError::AlreadyExists) => {
            debug!(what, "already registered");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_through_throttling() {
        let attempts = AtomicUsize::new(0);
        let result = call_with_retries(&RetryConfig::fast(), "op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ServiceError::Throttling)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_through_unknown_resource() {
        let attempts = AtomicUsize::new(0);
        let result = call_with_retries(&RetryConfig::fast(), "op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ServiceError::UnknownResource)
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let result: Result<(), _> = call_with_retries(&RetryConfig::fast(), "op", || async {
            Err(ServiceError::Transport("connection reset".into()))
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Transport(_))));
    }

    #[tokio::test]
    async fn ensure_registered_swallows_already_exists() {
        ensure_registered("domain", async { Err(ServiceError::AlreadyExists) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ensure_registered_propagates_other_errors() {
        let result = ensure_registered("domain", async {
            Err(ServiceError::Transport("boom".into()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Transport(_))));
    }
}
