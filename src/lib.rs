//! Precedence-ranked field claims for two-pass record rendering.
//!
//! A record (a form, a row, any named and ordered set of fields) is rendered
//! by a tree of constructs. Claim constructs name the fields they want with
//! patterns (`"title"`, `"text*"`, `"<=email"`, or nothing for "everything
//! else"). The tree is executed twice per record: the first pass only
//! registers the claims, the engine then hands every field to exactly one
//! claim by matcher precedence, and the second pass renders each claim's
//! fields in the claims' own declaration order.
//!
//! See [`render`] for the template-level entry point and [`assign_fields`]
//! for direct access to the assignment engine.

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod matcher;
mod template;

pub use api::{
    Context, Options, RenderResult, RenderResultVerbose, assign_fields, render, render_verbose_with, render_with,
};
pub use engine::{AssignStep, Assignment, ClaimSlot, Phase, RenderMetrics, Scope, ScopeMetrics, ScopeStack, assign};
pub use error::ClaimError;
pub use matcher::{Matcher, MatcherKind, PositionIndex, RelOp};
pub use template::{Claim, Construct, ConstructSet, PatternExpr, Template};

// --- Fields -----------------------------------------------------------------

/// A named item of a record, with its 0-based position in the record's
/// visible-field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub position: usize,
}

/// Ordered field source supplied by the host.
///
/// The order returned by [`visible_fields`](FieldSource::visible_fields) must
/// be stable for the lifetime of one Scope; positions are derived from it.
pub trait FieldSource {
    /// Names of the fields that must be claimed, in display order.
    fn visible_fields(&self) -> Vec<String>;

    /// Names of fields rendered by the hidden-fields construct instead of
    /// being claimed.
    fn hidden_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Plain owned [`FieldSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    visible: Vec<String>,
    hidden: Vec<String>,
}

impl Record {
    pub fn new<I, S>(visible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Record { visible: visible.into_iter().map(Into::into).collect(), hidden: Vec::new() }
    }

    pub fn with_hidden<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = hidden.into_iter().map(Into::into).collect();
        self
    }
}

impl FieldSource for Record {
    fn visible_fields(&self) -> Vec<String> {
        self.visible.clone()
    }

    fn hidden_fields(&self) -> Vec<String> {
        self.hidden.clone()
    }
}

impl FieldSource for [&str] {
    fn visible_fields(&self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}
