//! Retry classification for caption requests.

use crate::error::ProviderError;
use std::time::Duration;

/// Determine whether a provider error is worth retrying.
///
/// Retryable errors: rate limits (429), server errors (5xx), transport
/// timeouts and connection failures. Schema, validation and image read
/// errors will fail the same way again.
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
        ProviderError::Transport(e) => {
            if let Some(status) = e.status() {
                let code = status.as_u16();
                return code == 429 || (500..=599).contains(&code);
            }
            e.is_timeout() || e.is_connect()
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
