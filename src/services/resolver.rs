use std::time::{Duration, Instant};

use crate::error::{AppError, Result};

use super::Navigator;

/// Follows a tracking link through however many redirects it takes until
/// the page stops moving.
pub struct RedirectResolver<N> {
    navigator: N,
    timeout: Duration,
}

impl<N: Navigator> RedirectResolver<N> {
    pub fn new(navigator: N, timeout: Duration) -> Self {
        Self { navigator, timeout }
    }

    /// Returns the first URL the page reports back unchanged after
    /// navigating to it. The whole chain shares one time budget.
    pub async fn resolve(&mut self, url: &str) -> Result<String> {
        let start = Instant::now();
        let mut current = url.to_string();

        loop {
            let remaining = self
                .timeout
                .checked_sub(start.elapsed())
                .filter(|d| !d.is_zero())
                .ok_or_else(|| self.timeout_error(url))?;

            let landed = tokio::time::timeout(remaining, self.navigator.goto(&current))
                .await
                .map_err(|_| self.timeout_error(url))??;

            if landed == current {
                return Ok(landed);
            }

            tracing::debug!("{} redirected to {}", current, landed);
            current = landed;

            if start.elapsed() > self.timeout {
                return Err(self.timeout_error(url));
            }
        }
    }

    /// Release the underlying page once no more links need resolving.
    pub async fn close(&mut self) {
        if let Err(e) = self.navigator.close().await {
            tracing::warn!("Failed to close navigator: {}", e);
        }
    }

    #[cfg(test)]
    pub(crate) fn navigator(&self) -> &N {
        &self.navigator
    }

    fn timeout_error(&self, url: &str) -> AppError {
        AppError::RedirectTimeout {
            url: url.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}
