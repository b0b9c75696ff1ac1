//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::SocialError;

/// Wrap a future with a timeout. Expiry surfaces as a transport error.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, SocialError>>,
) -> Result<T, SocialError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(SocialError::transport(format!(
            "request timed out after {} ms",
            duration.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expiry_is_a_transport_error() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(SocialError::Transport { .. })));
    }
}
