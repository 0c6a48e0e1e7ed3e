//! Bounded exponential backoff for overload rejections.
use super::{CompletionClient, CompletionError, Transport};
use crate::config::RetryConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
    }
}

/// Wraps a transport with the overload retry loop.
pub struct RetryingClient<T> {
    transport: T,
    policy: RetryPolicy,
    sleep: fn(Duration),
}

impl<T: Transport> RetryingClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the sleep function (tests use a no-op).
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl<T: Transport> CompletionClient for RetryingClient<T> {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 1;
        loop {
            match self.transport.send(prompt) {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "completion succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        provider = %self.transport.provider(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "provider overloaded, backing off"
                    );
                    (self.sleep)(delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %self.transport.provider(),
                        attempt,
                        code = %err.code(),
                        "completion failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ErrorCode, ProviderKind};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Scripted {
        replies: RefCell<VecDeque<Result<String, CompletionError>>>,
        calls: RefCell<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl Transport for Scripted {
        fn provider(&self) -> ProviderKind {
            ProviderKind::Anthropic
        }

        fn send(&self, _prompt: &str) -> Result<String, CompletionError> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(overload()))
        }
    }

    fn overload() -> CompletionError {
        CompletionError::new(ErrorCode::Overload, ProviderKind::Anthropic, "busy")
    }

    fn no_sleep(_: Duration) {}

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2_000));
    }

    #[test]
    fn overload_is_retried_until_success() {
        let transport = Scripted::new(vec![Err(overload()), Ok("done".to_string())]);
        let client = RetryingClient::new(transport, RetryPolicy::new(3, Duration::ZERO))
            .with_sleep(no_sleep);
        assert_eq!(client.complete("p").expect("complete"), "done");
        assert_eq!(*client.transport().calls.borrow(), 2);
    }

    #[test]
    fn persistent_overload_stops_at_the_attempt_cap() {
        let client = RetryingClient::new(Scripted::new(Vec::new()), RetryPolicy::new(3, Duration::ZERO))
            .with_sleep(no_sleep);
        let err = client.complete("p").expect_err("exhausted");
        assert_eq!(err.code(), ErrorCode::Overload);
        assert_eq!(*client.transport().calls.borrow(), 3);
    }

    #[test]
    fn non_retryable_errors_propagate_immediately() {
        let auth = CompletionError::new(ErrorCode::Auth, ProviderKind::Anthropic, "bad key");
        let client = RetryingClient::new(
            Scripted::new(vec![Err(auth.clone()), Ok("never".to_string())]),
            RetryPolicy::new(4, Duration::ZERO),
        )
        .with_sleep(no_sleep);
        assert_eq!(client.complete("p").expect_err("auth"), auth);
        assert_eq!(*client.transport().calls.borrow(), 1);
    }
}
