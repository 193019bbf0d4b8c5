//! Fixed-interval retries for remote customer calls.

use std::future::Future;
use std::time::Duration;

use mailguard_core::CustomerId;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::warn;

use crate::pacing::MAX_ATTEMPTS;
use crate::shopify::ShopifyError;

/// Run `call` up to [`MAX_ATTEMPTS`] times, sleeping `delay` between attempts.
///
/// No backoff: Shopify failures here are either short rate-limit windows or
/// hard errors that more waiting will not fix. Every failed attempt is
/// logged; the last error is returned once attempts run out.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    customer_id: CustomerId,
    delay: Duration,
    mut call: F,
) -> Result<T, ShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ShopifyError>>,
{
    let strategy = FixedInterval::new(delay).take(MAX_ATTEMPTS - 1);
    let mut attempt = 0_usize;

    Retry::spawn(strategy, || {
        attempt += 1;
        let current = attempt;
        let fut = call();
        async move {
            fut.await.inspect_err(|e| {
                warn!(
                    operation,
                    customer_id = %customer_id,
                    attempt = current,
                    max_attempts = MAX_ATTEMPTS,
                    error = %e,
                    "Remote call failed"
                );
            })
        }
    })
    .await
}
