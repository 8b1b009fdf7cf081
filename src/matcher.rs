//! Field matchers.
//!
//! A matcher is a precedence-ranked predicate over the fields of one Scope.
//! During assignment the matchers of every claim slot are sorted by
//! precedence and greedily take the fields they match (see
//! `engine/assign.rs`).
//!
//! ## Pattern syntax
//!
//! Listed from highest to lowest priority:
//!
//! ```text
//! "name"    exact field name                 precedence  0  required
//! "name?"   exact, missing is fine           precedence  2
//! "*name"   name ends with "name"            precedence 10  required
//! "name*"   name starts with "name"          precedence 11  required
//! "*name?"  suffix, missing is fine          precedence 12
//! "name*?"  prefix, missing is fine          precedence 13
//! "<name"   fields before "name"             precedence 50
//! "<=name"  "name" and fields before it      precedence 50
//! ">name"   fields after "name"              precedence 60
//! ">=name"  "name" and fields after it       precedence 60
//! (none)    every remaining field            precedence 99
//! ```
//!
//! Lower number means the matcher runs first.

use std::collections::HashMap;
use std::fmt;

use crate::{ClaimError, Field};

/// Map of field name to its position in the original, pre-assignment order.
pub type PositionIndex = HashMap<String, usize>;

pub const PRECEDENCE_EXACT: u16 = 0;
pub const PRECEDENCE_SUFFIX: u16 = 10;
pub const PRECEDENCE_PREFIX: u16 = 11;
pub const PRECEDENCE_BEFORE: u16 = 50;
pub const PRECEDENCE_AFTER: u16 = 60;
pub const PRECEDENCE_ANY: u16 = 99;

/// Added to the base precedence of optional name matchers.
pub const OPTIONAL_PENALTY: u16 = 2;

/// Comparison operator of a relative matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(RelOp::Lt),
            "<=" => Some(RelOp::Le),
            ">" => Some(RelOp::Gt),
            ">=" => Some(RelOp::Ge),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    fn compare(self, candidate: usize, pivot: usize) -> bool {
        match self {
            RelOp::Lt => candidate < pivot,
            RelOp::Le => candidate <= pivot,
            RelOp::Gt => candidate > pivot,
            RelOp::Ge => candidate >= pivot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherKind {
    /// Catch-all.
    Any,
    Exact(String),
    /// `name*`
    Prefix(String),
    /// `*name`
    Suffix(String),
    Relative { op: RelOp, operand: String },
}

/// A parsed matcher: its kind, whether a miss is tolerated, and the literal
/// pattern text it was built from (used for the match registry and errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    kind: MatcherKind,
    optional: bool,
    text: String,
}

impl Matcher {
    /// The implicit matcher of a claim declared without patterns.
    pub fn any() -> Self {
        Matcher { kind: MatcherKind::Any, optional: true, text: String::new() }
    }

    /// Build a relative matcher from an operator string and an operand.
    pub fn relative(op: &str, operand: &str) -> Result<Self, ClaimError> {
        let invalid = || ClaimError::InvalidMatcherSyntax { raw: format!("{op}{operand}") };
        let op = RelOp::parse(op).ok_or_else(invalid)?;
        if operand.is_empty() {
            return Err(invalid());
        }
        let text = format!("{}{operand}", op.as_str());
        Ok(Matcher { kind: MatcherKind::Relative { op, operand: operand.to_string() }, optional: true, text })
    }

    /// Parse a raw pattern string.
    ///
    /// ```text
    /// "<x" / "<=x" / ">x" / ">=x"  -> Relative
    /// "...?"                      -> optional variant of the rest
    /// "x*" / "*x"                 -> Prefix / Suffix
    /// anything else               -> Exact
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ClaimError> {
        if let Some(caps) = regex!(r"(?s)^([<>]=?)(.*)$").captures(raw) {
            return Matcher::relative(&caps[1], &caps[2]);
        }

        let invalid = || ClaimError::InvalidMatcherSyntax { raw: raw.to_string() };

        let (body, optional) = match raw.strip_suffix('?') {
            Some(body) => (body, true),
            None => (raw, false),
        };

        let (name, kind): (&str, fn(String) -> MatcherKind) = if let Some(name) = body.strip_suffix('*') {
            (name, MatcherKind::Prefix)
        } else if let Some(name) = body.strip_prefix('*') {
            (name, MatcherKind::Suffix)
        } else {
            (body, MatcherKind::Exact)
        };

        if name.is_empty() || name.contains('*') {
            return Err(invalid());
        }

        Ok(Matcher { kind: kind(name.to_string()), optional, text: raw.to_string() })
    }

    pub fn kind(&self) -> &MatcherKind {
        &self.kind
    }

    /// Literal pattern text as written (`""` for the catch-all).
    pub fn pattern_text(&self) -> &str {
        &self.text
    }

    /// Whether matching zero fields is an error.
    pub fn is_required(&self) -> bool {
        match self.kind {
            MatcherKind::Any | MatcherKind::Relative { .. } => false,
            _ => !self.optional,
        }
    }

    pub fn precedence(&self) -> u16 {
        let base = match &self.kind {
            MatcherKind::Any => return PRECEDENCE_ANY,
            MatcherKind::Relative { op: RelOp::Lt | RelOp::Le, .. } => return PRECEDENCE_BEFORE,
            MatcherKind::Relative { op: RelOp::Gt | RelOp::Ge, .. } => return PRECEDENCE_AFTER,
            MatcherKind::Exact(_) => PRECEDENCE_EXACT,
            MatcherKind::Suffix(_) => PRECEDENCE_SUFFIX,
            MatcherKind::Prefix(_) => PRECEDENCE_PREFIX,
        };
        if self.optional { base + OPTIONAL_PENALTY } else { base }
    }

    /// Check that everything this matcher refers to exists in `index`.
    ///
    /// Only relative matchers refer to other fields. The operand is looked up
    /// in the original position map, so a field that was already taken by a
    /// higher-priority matcher still counts as existing.
    pub fn validate(&self, index: &PositionIndex) -> Result<(), ClaimError> {
        match &self.kind {
            MatcherKind::Relative { operand, .. } if !index.contains_key(operand) => {
                Err(ClaimError::UnknownOperand { name: operand.clone() })
            }
            _ => Ok(()),
        }
    }

    /// Return true if `field` is matched by this matcher.
    pub fn matches(&self, field: &Field, index: &PositionIndex) -> Result<bool, ClaimError> {
        let matched = match &self.kind {
            MatcherKind::Any => true,
            MatcherKind::Exact(name) => field.name == *name,
            MatcherKind::Prefix(prefix) => field.name.starts_with(prefix.as_str()),
            MatcherKind::Suffix(suffix) => field.name.ends_with(suffix.as_str()),
            MatcherKind::Relative { op, operand } => {
                let pivot =
                    index.get(operand).copied().ok_or_else(|| ClaimError::UnknownOperand { name: operand.clone() })?;
                op.compare(field.position, pivot)
            }
        };
        Ok(matched)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MatcherKind::Any => f.write_str("<any>"),
            _ => f.write_str(&self.text),
        }
    }
}
