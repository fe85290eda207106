//! # Innate Primitives
//!
//! Hardcoded limits and constants for the TRR engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Every user-supplied string and collection is bounded by one of them.

// =============================================================================
// READINESS GATE
// =============================================================================

/// Minimum trimmed character count for a description to satisfy the DOR.
pub const MIN_DESCRIPTION_LENGTH: usize = 20;

/// Number of Definition-of-Ready checks. The DOR score is `met * 100 / DOR_CHECK_COUNT`.
pub const DOR_CHECK_COUNT: u8 = 5;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length (in characters) of a TRR title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length (in characters) of a TRR description.
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;

/// Maximum length of free-text fields such as business impact, expected
/// outcome, customer, and assignee.
pub const MAX_TEXT_FIELD_LENGTH: usize = 2_000;

/// Maximum length of a status or approval note.
pub const MAX_NOTE_LENGTH: usize = 2_000;

/// Maximum length of an author or approver identifier.
pub const MAX_ACTOR_LENGTH: usize = 256;

/// Maximum number of acceptance criteria on a single TRR.
pub const MAX_ACCEPTANCE_CRITERIA: usize = 100;

/// Maximum number of test cases on a single TRR.
pub const MAX_TEST_CASES: usize = 500;

/// Maximum number of tags on a single TRR.
pub const MAX_TAGS: usize = 50;

/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 64;

/// Maximum number of entries in the extension map.
pub const MAX_EXTENSIONS: usize = 64;

/// Maximum length of an extension key.
pub const MAX_EXTENSION_KEY_LENGTH: usize = 64;

// =============================================================================
// TIME
// =============================================================================

/// Milliseconds in one day, used to turn `Timestamp`s into epoch days.
pub const MILLIS_PER_DAY: u64 = 86_400_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dor_score_is_integral() {
        assert_eq!(100 % u32::from(DOR_CHECK_COUNT), 0);
    }

    #[test]
    fn test_limits_are_positive() {
        assert!(MIN_DESCRIPTION_LENGTH < MAX_DESCRIPTION_LENGTH);
        assert!(MAX_TITLE_LENGTH > 0);
        assert!(MAX_TAG_LENGTH > 0);
    }
}
