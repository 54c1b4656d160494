//! Retry utilities with exponential backoff for transient transport failures.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&HttpConfig> for RetryConfig {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            // leave room for the connect phase on top of the request timeout
            attempt_timeout: Duration::from_secs(config.timeout_secs + config.connect_timeout_secs),
            ..Self::default()
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(f64::from(attempt.saturating_sub(1)));
        Duration::from_secs_f64(exp_delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Rate limit exceeded (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Attempt exceeded its timeout
    Timeout,
}

impl TransientError {
    /// Check if a SourceError represents a transient error
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Api { status, .. } if *status >= 500 => Some(TransientError::ServerError),
            SourceError::EmptyPage { .. } => Some(TransientError::ServerError),
            _ => None,
        }
    }

    /// Minimum delay before retrying this kind of error
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::RateLimit => Duration::from_secs(5),
            TransientError::ServerError => Duration::from_secs(2),
            TransientError::Network | TransientError::Timeout => Duration::from_secs(1),
        }
    }
}

/// Execute an async operation with retry logic
///
/// Permanent errors are returned immediately; transient ones are retried
/// until `max_attempts` is reached, after which the last error is returned.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        let (error, transient) = match timeout(config.attempt_timeout, operation()).await {
            Ok(Ok(result)) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Ok(Err(error)) => match TransientError::from_source_error(&error) {
                Some(transient) => (error, transient),
                None => return Err(error),
            },
            Err(_) => (
                SourceError::Network("Operation timed out".to_string()),
                TransientError::Timeout,
            ),
        };

        if attempts >= config.max_attempts {
            if config.max_attempts > 1 {
                tracing::warn!("Operation failed after {} attempts: {}", attempts, error);
            }
            return Err(error);
        }

        let delay = std::cmp::max(config.delay_for(attempts), transient.recommended_delay());
        tracing::debug!(
            "Transient error on attempt {}: {:?}, retrying in {:?}",
            attempts,
            transient,
            delay
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(3), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(4), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    let count = *call_count.borrow();
                    if count < 3 {
                        Err(SourceError::Network("temporary error".to_string()))
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<&str, SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(5), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::Parse("bad xml".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::Parse(_))));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<&str, SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(1), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::Network("connection refused".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::Network(_))));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_transient_error_detection() {
        assert_eq!(
            TransientError::from_source_error(&SourceError::RateLimit),
            Some(TransientError::RateLimit)
        );
        assert_eq!(
            TransientError::from_source_error(&SourceError::Network("reset".to_string())),
            Some(TransientError::Network)
        );
        assert_eq!(
            TransientError::from_source_error(&SourceError::Api {
                status: 503,
                message: "unavailable".to_string()
            }),
            Some(TransientError::ServerError)
        );
        assert!(TransientError::from_source_error(&SourceError::Api {
            status: 404,
            message: "missing".to_string()
        })
        .is_none());
        assert!(
            TransientError::from_source_error(&SourceError::Parse("invalid".to_string())).is_none()
        );
        assert_eq!(
            TransientError::from_source_error(&SourceError::EmptyPage { start: 100, total: 250 }),
            Some(TransientError::ServerError)
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = fast_config(10);
        assert_eq!(config.delay_for(1), Duration::from_millis(10));
        assert_eq!(config.delay_for(2), Duration::from_millis(20));
        assert_eq!(config.delay_for(8), Duration::from_millis(50));
    }

    #[test]
    fn test_from_http_config() {
        let http = HttpConfig {
            max_attempts: 0,
            ..HttpConfig::default()
        };
        let config = RetryConfig::from(&http);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.attempt_timeout, Duration::from_secs(40));
    }
}
