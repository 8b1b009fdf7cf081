//! Assignment trace and timings.
//!
//! Collected for every Scope; only the verbose entry points and the CLI
//! surface them.

use std::time::Duration;

/// One matcher's turn during assignment, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignStep {
    /// Slot (registration index) the matcher belongs to.
    pub slot: usize,
    /// Literal pattern text (`""` for the catch-all).
    pub pattern: String,
    pub precedence: u16,
    /// Names of the fields taken, in field order.
    pub taken: Vec<String>,
}

/// Metrics for one closed Scope.
#[derive(Debug, Default, Clone)]
pub struct ScopeMetrics {
    /// Name of the record the Scope was opened for.
    pub record: String,
    pub fields: usize,
    pub slots: usize,
    pub steps: Vec<AssignStep>,
    /// Patterns that captured at least one field, sorted.
    pub matched: Vec<String>,
    /// Time spent in assignment.
    pub assign: Duration,
    /// Time from opening to closing the Scope (both passes).
    pub total: Duration,
}

#[derive(Debug, Default, Clone)]
pub struct RenderMetrics {
    /// Total elapsed time for the render call.
    pub total: Duration,
    /// One entry per Scope, in the order they closed (inner before outer).
    pub scopes: Vec<ScopeMetrics>,
}
