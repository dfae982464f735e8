//! Captioning Client
//!
//! Wraps a [`CaptionService`] with prompt templating, client-side rate
//! limiting and an explicit [`RetryPolicy`].
//!
//! **Failure semantics:**
//! - `caption()` / `caption_watkins()` return `GenerationFailed` once every
//!   attempt is spent; callers substitute a template caption
//! - `recaption()` never fails; the old caption comes back unchanged

use crate::error::{CaptionError, ServiceError};
use crate::services::prompt_templates::{ChatMessage, PromptKind, PromptLibrary};
use crate::services::watkins::WatkinsMetadata;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text-generation backend: conversation in, completion text out
#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn send(&self, conversation: &[ChatMessage]) -> Result<String, ServiceError>;
}

/// Randomized exponential backoff with a fixed attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_backoff,
            max_backoff: max_backoff.max(min_backoff),
        }
    }

    /// Upper bound of the wait after failed attempt `attempt` (1-based):
    /// `min * 2^(attempt-1)`, clamped to `[min, max]`
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_backoff
            .saturating_mul(factor)
            .clamp(self.min_backoff, self.max_backoff)
    }

    /// Wait drawn uniformly from `[min, ceiling(attempt)]`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let low = self.min_backoff.as_millis() as u64;
        let high = self.backoff_ceiling(attempt).as_millis() as u64;
        if high <= low {
            return self.min_backoff;
        }
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Giving up: retry budget exhausted"
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                Err(err) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = wait.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

type DirectLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Fields available to the initial caption prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub label: &'a str,
    pub description: Option<&'a str>,
}

pub struct CaptioningClient {
    service: Arc<dyn CaptionService>,
    prompts: Arc<PromptLibrary>,
    retry: RetryPolicy,
    limiter: Option<DirectLimiter>,
}

impl CaptioningClient {
    pub fn new(
        service: Arc<dyn CaptionService>,
        prompts: Arc<PromptLibrary>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            service,
            prompts,
            retry,
            limiter: None,
        }
    }

    /// Cap outgoing requests (every attempt counts)
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(requests_per_second)
            .map(|rps| governor::RateLimiter::direct(governor::Quota::per_second(rps)));
        self
    }

    /// Caption from species and observation notes
    ///
    /// Without a description there is nothing to ground a caption in, and
    /// the label itself is returned without calling the service.
    pub async fn caption(&self, ctx: PromptContext<'_>) -> Result<String, CaptionError> {
        let description = match ctx.description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => d,
            None => return Ok(ctx.label.to_string()),
        };

        let conversation = self.prompts.conversation(
            PromptKind::InitialCaption,
            &[("species", ctx.label), ("description", description)],
        )?;
        self.complete("caption", &conversation).await
    }

    /// Caption from Watkins structured metadata
    pub async fn caption_watkins(&self, meta: &WatkinsMetadata) -> Result<String, CaptionError> {
        let signal_type = meta.signal_type_text();
        let conversation = self.prompts.conversation(
            PromptKind::WatkinsCaption,
            &[
                ("species", meta.species.as_str()),
                ("genus_species", meta.genus_species.as_str()),
                ("signal_type", signal_type.as_str()),
                ("behavior", meta.behavior.as_str()),
                ("num_animals", meta.num_animals.as_str()),
                ("notes", meta.notes.as_str()),
            ],
        )?;
        self.complete("caption_watkins", &conversation).await
    }

    /// Best-effort polish of an existing caption
    pub async fn recaption(&self, old_caption: &str) -> String {
        let result = match self
            .prompts
            .conversation(PromptKind::Recaption, &[("caption", old_caption)])
        {
            Ok(conversation) => self.complete("recaption", &conversation).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(caption) => caption,
            Err(e) => {
                warn!(error = %e, "Recaption failed, keeping previous caption");
                old_caption.to_string()
            }
        }
    }

    async fn complete(
        &self,
        operation_name: &str,
        conversation: &[ChatMessage],
    ) -> Result<String, CaptionError> {
        let outcome = self
            .retry
            .run(operation_name, move || self.attempt(conversation))
            .await;

        outcome.map_err(|exhausted| CaptionError::GenerationFailed {
            attempts: exhausted.attempts,
            last_error: exhausted.last_error.to_string(),
        })
    }

    /// One rate-limited service call; blank completions count as failures
    async fn attempt(&self, conversation: &[ChatMessage]) -> Result<String, ServiceError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        let text = self.service.send(conversation).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_ceiling_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_secs(8));
        assert_eq!(policy.backoff_ceiling(7), Duration::from_secs(60));
        assert_eq!(policy.backoff_ceiling(40), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..=8 {
            let wait = policy.backoff(attempt);
            assert!(wait >= policy.min_backoff);
            assert!(wait <= policy.backoff_ceiling(attempt));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_after_budget() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(4));

        let result = policy
            .run("always_fails", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom")
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_first_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::default();

        let result = policy
            .run("flaky", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err("not yet")
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }
}
