//! Idempotency guard: decides whether a source record still needs migrating.

use chrono::{DateTime, Utc};

use crate::core::TargetRecord;

/// Outcome of the freshness comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Write the record (new, or strictly newer than the target copy).
    Proceed,
    /// The target already holds this version or a newer one.
    Skip,
}

/// Compare the source freshness marker with the existing target record.
///
/// Equal markers skip, so re-running over an unchanged source writes nothing.
pub fn should_migrate<R: TargetRecord>(
    source_freshness: DateTime<Utc>,
    existing: Option<&R>,
) -> GuardDecision {
    match existing {
        Some(current) if current.updated_at() >= source_freshness => GuardDecision::Skip,
        _ => GuardDecision::Proceed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::translate_async_operation;
    use crate::testing::async_op;

    fn ts(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_no_existing_record_proceeds() {
        let decision =
            should_migrate::<crate::translate::PgAsyncOperation>(ts(100), None);
        assert_eq!(decision, GuardDecision::Proceed);
    }

    #[test]
    fn test_same_or_newer_target_skips() {
        let existing = translate_async_operation(&async_op("a1", 100, "RUNNING")).unwrap();
        assert_eq!(should_migrate(ts(100), Some(&existing)), GuardDecision::Skip);
        assert_eq!(should_migrate(ts(99), Some(&existing)), GuardDecision::Skip);
    }

    #[test]
    fn test_newer_source_proceeds() {
        let existing = translate_async_operation(&async_op("a1", 100, "RUNNING")).unwrap();
        assert_eq!(should_migrate(ts(101), Some(&existing)), GuardDecision::Proceed);
    }
}
