use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

pub const DEFAULT_MAX_RETRIES: u32 = 5;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// A failure that is not a rate-limit signal, passed through untouched.
    #[error("{0}")]
    Failed(E),
    #[error("Maximum retries exceeded after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Errors that can tell whether the remote side asked us to slow down.
pub trait Retryable {
    fn is_rate_limited(&self) -> bool;
}

// ── Injected time and randomness ─────────────────────────────────────────────

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Source of jitter in `[0, 1)`.
pub trait Jitter: Send + Sync {
    fn sample(&self) -> f64;
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

// ── Backoff policy ───────────────────────────────────────────────────────────

/// Exponential backoff around a remote call, retrying only on rate limiting.
///
/// Attempt `i` (zero-indexed) that hits a rate limit waits `2^i + jitter`
/// seconds before attempt `i + 1`. At most `max_retries` calls are made.
#[derive(Clone)]
pub struct Backoff {
    max_retries: u32,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn Jitter>,
}

impl Backoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the retry that follows attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Millisecond resolution keeps the jitter strictly below one second.
        let jitter_ms = ((self.jitter.sample() * 1000.0) as u64).min(999);
        let base_ms = 2u64.saturating_pow(attempt).saturating_mul(1000);
        Duration::from_millis(base_ms.saturating_add(jitter_ms))
    }

    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        for attempt in 0..self.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() => {
                    if attempt + 1 < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            "Rate limit exceeded ({}). Retrying in {:.2} seconds (attempt {}/{})",
                            e,
                            delay.as_secs_f64(),
                            attempt + 1,
                            self.max_retries
                        );
                        self.sleeper.sleep(delay).await;
                    } else {
                        tracing::warn!(
                            "Rate limit exceeded ({}) on final attempt {}/{}",
                            e,
                            attempt + 1,
                            self.max_retries
                        );
                    }
                }
                Err(e) => return Err(RetryError::Failed(e)),
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_retries,
        })
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
