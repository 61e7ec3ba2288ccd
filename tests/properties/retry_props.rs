use std::time::Duration;

use proptest::prelude::*;

use movemint::api::{ApiError, ApiErrorHandler, RetryPolicy, is_retryable_status};

proptest! {
    #[test]
    fn classification_is_pure(status in 400_u16..600, body in ".{0,60}") {
        let first = ApiError::from_status(status, &body);
        let second = ApiError::from_status(status, &body);
        prop_assert_eq!(first.code, second.code);
        prop_assert_eq!(first.retryable, is_retryable_status(status));
        prop_assert_eq!(ApiErrorHandler::classify(&first), ApiErrorHandler::classify(&second));
    }

    #[test]
    fn delays_stay_within_bounds(
        attempt in 0_u32..20,
        initial_ms in 1_u64..2_000,
        extra_ms in 0_u64..20_000,
        multiplier in 1.0..5.0_f64,
        jitter in 0.0..1.0_f64,
    ) {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(initial_ms + extra_ms),
            backoff_multiplier: multiplier,
            jitter_factor: jitter,
        };
        let delay = policy.delay_for_attempt(attempt);
        prop_assert!(delay <= policy.max_delay);
        prop_assert!(policy.base_delay(attempt) <= policy.max_delay);
        prop_assert!(policy.base_delay(attempt) <= policy.base_delay(attempt + 1));
    }
}
