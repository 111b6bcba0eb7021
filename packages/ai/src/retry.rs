//! Bounded retry with credential rotation.
//!
//! A [`RotatingGenerator`] holds one provider per API credential. Each call
//! goes to the current provider; when it fails and attempts remain, the
//! next credential becomes current and the call is retried after an
//! exponential backoff (`base_delay`, `2 * base_delay`, …). With
//! `max_attempts = 1` the first failure is returned unchanged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::AiError;
use crate::providers::TextGenerator;

/// How many times a call may be attempted and how long to wait between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each later retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1 << retry.min(16))
    }
}

/// A [`TextGenerator`] that rotates through several credentials on failure.
pub struct RotatingGenerator {
    generators: Vec<Box<dyn TextGenerator>>,
    policy: RetryPolicy,
    current: AtomicUsize,
}

impl RotatingGenerator {
    /// Creates a rotating generator.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `generators` is empty or
    /// `policy.max_attempts` is zero.
    pub fn new(
        generators: Vec<Box<dyn TextGenerator>>,
        policy: RetryPolicy,
    ) -> Result<Self, AiError> {
        if generators.is_empty() {
            return Err(AiError::Config {
                message: "at least one credential is required".to_string(),
            });
        }
        if policy.max_attempts == 0 {
            return Err(AiError::Config {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(Self {
            generators,
            policy,
            current: AtomicUsize::new(0),
        })
    }

    /// Index of the credential the next call will use.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed) % self.generators.len()
    }

    fn rotate(&self) -> usize {
        let next = (self.current_index() + 1) % self.generators.len();
        self.current.store(next, Ordering::Relaxed);
        next
    }
}

#[async_trait::async_trait]
impl TextGenerator for RotatingGenerator {
    async fn generate(&self, parts: &[String]) -> Result<String, AiError> {
        let mut attempt = 0;
        loop {
            let idx = self.current_index();
            match self.generators[idx].generate(parts).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts || matches!(e, AiError::Config { .. }) {
                        return Err(e);
                    }
                    let next = self.rotate();
                    let delay = self.policy.delay_for(attempt - 1);
                    log::warn!(
                        "Model call failed with credential #{idx} ({e}); \
                         retry {attempt}/{} with credential #{next} in {delay:?}",
                        self.policy.max_attempts - 1
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;

    use super::*;

    /// Fails the first `failures` calls made through any clone, then echoes
    /// its label.
    struct Flaky {
        label: &'static str,
        failures: Arc<AtomicU32>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _parts: &[String]) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(AiError::Provider {
                    message: format!("{} quota exhausted", self.label),
                });
            }
            Ok(self.label.to_string())
        }
    }

    fn flaky_pair(failures: u32) -> (Vec<Box<dyn TextGenerator>>, Arc<AtomicU32>) {
        let shared = Arc::new(AtomicU32::new(failures));
        let calls = Arc::new(AtomicU32::new(0));
        let generators: Vec<Box<dyn TextGenerator>> = vec![
            Box::new(Flaky {
                label: "first",
                failures: shared.clone(),
                calls: calls.clone(),
            }),
            Box::new(Flaky {
                label: "second",
                failures: shared,
                calls: calls.clone(),
            }),
        ];
        (generators, calls)
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn single_attempt_propagates_first_failure() {
        let (generators, calls) = flaky_pair(1);
        let generator = RotatingGenerator::new(generators, policy(1)).unwrap();

        let err = generator.generate(&[]).await.unwrap_err();
        assert!(err.to_string().contains("first quota exhausted"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.current_index(), 0);
    }

    #[tokio::test]
    async fn rotates_to_next_credential_on_failure() {
        let (generators, calls) = flaky_pair(1);
        let generator = RotatingGenerator::new(generators, policy(3)).unwrap();

        assert_eq!(generator.generate(&[]).await.unwrap(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The working credential stays current for later calls.
        assert_eq!(generator.generate(&[]).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (generators, calls) = flaky_pair(10);
        let generator = RotatingGenerator::new(generators, policy(3)).unwrap();

        assert!(generator.generate(&[]).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn rejects_empty_credentials_and_zero_attempts() {
        assert!(RotatingGenerator::new(Vec::new(), policy(1)).is_err());
        let (generators, _) = flaky_pair(0);
        assert!(RotatingGenerator::new(generators, policy(0)).is_err());
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }
}
