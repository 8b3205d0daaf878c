// src/retry.rs
use std::time::Duration;

use rand::Rng;

/// Retries a fallible async operation with exponential backoff and jitter.
///
/// The operation is invoked up to `max_retries + 1` times. After each failure
/// with attempts remaining, the current delay is slept, then grown by
/// `delay * 1.5 + random(0, 1000)` milliseconds for the next wait. When all
/// attempts fail the last error is returned; deciding whether that is fatal
/// is the caller's job. The wrapped call must be safe to repeat.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    max_retries: u32,
    initial_delay_ms: u64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut delay_ms = initial_delay_ms;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let jitter = rand::thread_rng().gen_range(0..1000u64);
                delay_ms = (delay_ms as f64 * 1.5) as u64 + jitter;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn returns_success_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result: Result<&str, &str> = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok("done")
                    }
                }
            },
            3,
            100,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_surfaces_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {}", n)) }
            },
            2,
            50,
        )
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_a_single_attempt() {
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            },
            0,
            10,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_skips_the_backoff_entirely() {
        let result: Result<i32, ()> = retry_with_backoff(|| async { Ok(42) }, 5, 1000).await;
        assert_eq!(result, Ok(42));
    }
}
