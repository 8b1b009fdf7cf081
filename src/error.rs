//! Error taxonomy.
//!
//! Every error is fatal to the Scope that produced it: resolution stops at the
//! point of detection and nothing rendered so far is returned. These are
//! authoring errors (a misspelled field, a forgotten catch-all) and are meant
//! to be fixed in the construct tree, not handled at runtime.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// A required matcher captured zero fields.
    #[error("matcher {pattern:?} did not match any field")]
    RequiredMatchFailed { pattern: String },

    /// A relative matcher names a field that does not exist in the Scope.
    #[error("no such field: {name:?}")]
    UnknownOperand { name: String },

    /// Fields remained in the candidate pool after every matcher ran.
    #[error("{} field(s) left over: {}", names.len(), names.join(", "))]
    LeftoverFields { names: Vec<String> },

    #[error("invalid matcher syntax: {raw:?}")]
    InvalidMatcherSyntax { raw: String },

    /// A construct ran without an active Scope, or in the wrong phase of one.
    #[error("{construct} must run inside an active record scope")]
    Scope { construct: &'static str },

    /// A claim containing nested claims captured a field count its body
    /// cannot be rendered with (more than one, or zero while its nested
    /// claims captured fields).
    #[error("claim {pattern:?} contains nested claims but matched {matched} field(s); exactly one is required")]
    NestedClaimOverflow { pattern: String, matched: usize },

    /// The rendering pass did not consume the claim slots exactly once, in
    /// registration order.
    #[error("claim slot {index} was not consumed exactly once by the rendering pass")]
    SlotMismatch { index: usize },

    #[error("field {name:?} appears more than once in the record")]
    DuplicateField { name: String },

    #[error("unknown record: {name:?}")]
    UnknownRecord { name: String },

    #[error("pattern variable {variable:?} could not be resolved")]
    UnresolvedPattern { variable: String },

    #[error("claims cannot be nested inside a match query of the same record")]
    MisplacedClaim,
}

impl ClaimError {
    pub(crate) fn scope(construct: &'static str) -> Self {
        ClaimError::Scope { construct }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leftover_message_lists_count_and_names() {
        let err = ClaimError::LeftoverFields { names: vec!["a".to_string(), "b".to_string()] };
        assert_eq!(err.to_string(), "2 field(s) left over: a, b");
    }

    #[test]
    fn required_message_quotes_pattern() {
        let err = ClaimError::RequiredMatchFailed { pattern: "title".to_string() };
        assert_eq!(err.to_string(), "matcher \"title\" did not match any field");
    }
}
