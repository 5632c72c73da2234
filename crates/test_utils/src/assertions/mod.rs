// Path: crates/test_utils/src/assertions/mod.rs
//! Assertion utilities for testing

/// Assert that a result is OK and unwrap it
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
}

/// Assert that a result is an `Err` matching `pattern`, and return the error.
#[macro_export]
macro_rules! assert_err_matches {
    ($expr:expr, $pattern:pat) => {
        match $expr {
            Ok(val) => panic!("Expected Err({}), got Ok: {:?}", stringify!($pattern), val),
            Err(err) => {
                assert!(
                    matches!(err, $pattern),
                    "Expected {}, got {:?}",
                    stringify!($pattern),
                    err
                );
                err
            }
        }
    };
}

/// Assert that a condition outcome is `Satisfied` and return the decoded value.
#[macro_export]
macro_rules! assert_satisfied {
    ($outcome:expr) => {
        match $outcome {
            oraclegate_services::consumer::ConditionOutcome::Satisfied(v) => v,
            other => panic!("Expected Satisfied, got {:?}", other),
        }
    };
}

/// Assert that a listing is in `(submitted_at, nonce, sequence)` order.
#[macro_export]
macro_rules! assert_listing_ordered {
    ($snapshot:expr) => {
        let keys: Vec<_> = $snapshot.iter().map(|s| s.order_key()).collect();
        assert!(
            keys.windows(2).all(|w| w[0] < w[1]),
            "listing out of order: {:?}",
            keys
        );
    };
}
