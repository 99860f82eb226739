//! Tests for the retry module

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_constant_by_default() {
        let backoff = BackoffStrategy::new(250, 30_000);
        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(250));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(250));
        assert_eq!(backoff.calculate_delay(7), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_exponential_growth() {
        let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(2.0);

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(backoff.calculate_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_max_limit() {
        let backoff = BackoffStrategy::new(100, 1000).with_multiplier(2.0);
        assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_zero_delay() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.calculate_delay(0), Duration::ZERO);
        assert_eq!(backoff.calculate_delay(5), Duration::ZERO);
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let backoff = BackoffStrategy::constant(1000).with_jitter(true);

        for _ in 0..50 {
            let delay = backoff.calculate_delay(0);
            assert!(
                delay >= Duration::from_millis(750) && delay <= Duration::from_millis(1250),
                "Delay {:?} should be between 750ms and 1250ms",
                delay
            );
        }
    }

    #[test]
    fn test_backoff_max_at_least_initial() {
        let backoff = BackoffStrategy::new(1000, 100);
        assert_eq!(backoff.max_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_multiplier_minimum() {
        let backoff = BackoffStrategy::new(100, 1000).with_multiplier(0.5);
        assert_eq!(backoff.multiplier(), 1.0);

        let backoff = BackoffStrategy::new(100, 1000).with_multiplier(f64::NAN);
        assert_eq!(backoff.multiplier(), 1.0);
    }
}

mod policy_tests {
    use super::*;

    #[tokio::test]
    async fn test_policy_returns_first_success() {
        let policy = RetryPolicy::new(3, BackoffStrategy::default());
        let calls = AtomicU32::new(0);

        let value = policy
            .run("connect", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(7) }
            })
            .await
            .expect("success");

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_policy_retries_until_success() {
        let policy = RetryPolicy::new(3, BackoffStrategy::constant(1));
        let calls = Arc::new(AtomicU32::new(0));

        let value = policy
            .run("connect", |attempt| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        anyhow::bail!("refused on attempt {}", attempt);
                    }
                    Ok(attempt)
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_policy_exhaustion_reports_last_error() {
        let policy = RetryPolicy::new(2, BackoffStrategy::default());

        let err = policy
            .run("connect", |attempt| async move {
                Err::<(), _>(anyhow::anyhow!("refused on attempt {}", attempt))
            })
            .await
            .expect_err("all attempts fail");

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error.to_string(), "refused on attempt 3");
        assert_eq!(
            err.to_string(),
            "gave up after 3 attempt(s): refused on attempt 3"
        );
    }

    #[tokio::test]
    async fn test_policy_waits_between_attempts() {
        let policy = RetryPolicy::new(2, BackoffStrategy::constant(30));
        let start = std::time::Instant::now();

        let _ = policy
            .run("connect", |_| async { Err::<(), _>(anyhow::anyhow!("down")) })
            .await;

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_no_retry_policy() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.retries(), 0);
        assert_eq!(policy.max_attempts(), 1);
    }
}
