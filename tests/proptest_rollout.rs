//! Property-based tests for rollout evaluation.
//!
//! Covers kill switch precedence, percentage boundaries, determinism and
//! monotonicity over arbitrary user identities.

use appconfig_evaluator::provider::{SnapshotProvider, StaticSource};
use appconfig_evaluator::{bucket, in_rollout, ErrorType, FlagEvaluator};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const FEATURE: &str = "advancedSearch";

fn evaluator_with(enabled: Option<bool>, rollout: Option<i64>) -> FlagEvaluator {
    let source = StaticSource::default();
    if let Some(enabled) = enabled {
        source.set(
            format!("services.dpsm-api.features.{}.enabled", FEATURE),
            json!(enabled),
        );
    }
    if let Some(rollout) = rollout {
        source.set(
            format!("services.dpsm-api.features.{}.rolloutPercentage", FEATURE),
            json!(rollout),
        );
    }
    let provider = SnapshotProvider::new(Arc::new(source)).unwrap();
    FlagEvaluator::new(Arc::new(provider))
}

fn user_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_-]{1,32}",
        "user-[0-9]{1,6}",
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        "[^\\s]{1,16}",
    ]
}

proptest! {
    #[test]
    fn bucket_is_always_in_range(user in user_id_strategy()) {
        prop_assert!(bucket(&user) < 100);
    }

    #[test]
    fn absent_feature_is_never_enabled(user in user_id_strategy()) {
        let evaluator = evaluator_with(None, None);
        prop_assert!(!evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap());
    }

    #[test]
    fn kill_switch_wins_over_rollout(
        user in user_id_strategy(),
        rollout in prop::option::of(-50i64..250),
    ) {
        let evaluator = evaluator_with(Some(false), rollout);
        prop_assert!(!evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap());
    }

    #[test]
    fn full_rollout_enables_everyone(user in user_id_strategy(), rollout in 100i64..10_000) {
        let evaluator = evaluator_with(Some(true), Some(rollout));
        prop_assert!(evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap());
    }

    #[test]
    fn missing_rollout_enables_everyone(user in user_id_strategy()) {
        let evaluator = evaluator_with(Some(true), None);
        prop_assert!(evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap());
    }

    #[test]
    fn zero_rollout_enables_nobody(user in user_id_strategy(), rollout in -10_000i64..=0) {
        let evaluator = evaluator_with(Some(true), Some(rollout));
        prop_assert!(!evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap());
    }

    #[test]
    fn evaluation_is_deterministic(user in user_id_strategy(), rollout in 0i64..=100) {
        let first = evaluator_with(Some(true), Some(rollout));
        let second = evaluator_with(Some(true), Some(rollout));

        let a = first.is_feature_enabled_for_user(FEATURE, &user).unwrap();
        let b = first.is_feature_enabled_for_user(FEATURE, &user).unwrap();
        let c = second.is_feature_enabled_for_user(FEATURE, &user).unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(a, c);
        prop_assert_eq!(a, in_rollout(&user, rollout));
    }

    #[test]
    fn raising_rollout_never_removes_users(
        user in user_id_strategy(),
        low in 0i64..=100,
        raise in 0i64..=100,
    ) {
        let high = (low + raise).min(100);
        let before = evaluator_with(Some(true), Some(low))
            .is_feature_enabled_for_user(FEATURE, &user)
            .unwrap();
        let after = evaluator_with(Some(true), Some(high))
            .is_feature_enabled_for_user(FEATURE, &user)
            .unwrap();
        prop_assert!(!before || after);
    }

    #[test]
    fn blank_user_is_rejected(user in "[ \\t\\n]{0,6}", enabled in any::<bool>()) {
        let evaluator = evaluator_with(Some(enabled), Some(50));
        let err = evaluator.is_feature_enabled_for_user(FEATURE, &user).unwrap_err();
        prop_assert_eq!(err.error_type, ErrorType::InvalidInput);
    }
}
