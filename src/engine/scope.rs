//! Per-record resolution state.
//!
//! A `Scope` owns everything one record boundary needs across both passes:
//! the field pool, the claim slots in registration order, and the match
//! registry. It moves through a fixed set of phases:
//!
//! ```text
//! open() ─▶ Registering ─assign()─▶ Assigned ─begin_rendering()─▶ Rendering ─close()─▶ Closed
//!                          │
//!                          └─ error ─▶ Failed
//! ```
//!
//! Every operation checks the phase it is called in and fails with
//! `ClaimError::Scope` otherwise, so a construct always knows which pass it
//! is executing in by asking the Scope.
//!
//! During rendering, slots are drained first-in-first-out across the whole
//! Scope: the tree is re-executed in the same order it registered in, so the
//! next claim to execute always owns the next undrained slot.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::debug;

use super::assign::{assign, fields_from_names};
use super::metrics::{AssignStep, ScopeMetrics};
use crate::{ClaimError, Field, FieldSource, Matcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Registering,
    Assigned,
    Rendering,
    Closed,
    /// Assignment failed; the Scope is unusable.
    Failed,
}

/// The ordered assignment target of one claim construct.
#[derive(Debug, Clone)]
pub struct ClaimSlot {
    /// Registration order within the Scope.
    pub index: usize,
    pub matchers: Vec<Matcher>,
    /// Number of slots registered by claims nested inside this one. They
    /// directly follow this slot.
    pub nested: usize,
    pub assigned: Vec<Field>,
    consumed: bool,
}

impl ClaimSlot {
    /// Space-separated pattern texts of this slot's matchers.
    pub fn label(&self) -> String {
        self.matchers.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ")
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

#[derive(Debug)]
pub struct Scope {
    record: String,
    phase: Phase,
    fields: Vec<Field>,
    hidden: Vec<String>,
    slots: Vec<ClaimSlot>,
    matched: BTreeSet<String>,
    cursor: usize,
    steps: Vec<AssignStep>,
    assign_duration: Duration,
    opened: Instant,
}

impl Scope {
    /// Open a Scope over `source`, ready for registration.
    pub fn open(record: impl Into<String>, source: &dyn FieldSource) -> Result<Self, ClaimError> {
        let record = record.into();
        let fields = fields_from_names(source.visible_fields())?;
        debug!(record = %record, fields = fields.len(), "scope_opened");

        Ok(Scope {
            record,
            phase: Phase::Registering,
            fields,
            hidden: source.hidden_fields(),
            slots: Vec::new(),
            matched: BTreeSet::new(),
            cursor: 0,
            steps: Vec::new(),
            assign_duration: Duration::ZERO,
            opened: Instant::now(),
        })
    }

    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn hidden_fields(&self) -> &[String] {
        &self.hidden
    }

    pub fn slots(&self) -> &[ClaimSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&ClaimSlot> {
        self.slots.get(index)
    }

    fn require_phase(&self, phase: Phase, operation: &'static str) -> Result<(), ClaimError> {
        if self.phase == phase { Ok(()) } else { Err(ClaimError::scope(operation)) }
    }

    /// Append a slot for one claim construct and return its index.
    pub fn register(&mut self, matchers: Vec<Matcher>) -> Result<usize, ClaimError> {
        self.require_phase(Phase::Registering, "register")?;
        let index = self.slots.len();
        self.slots.push(ClaimSlot { index, matchers, nested: 0, assigned: Vec::new(), consumed: false });
        Ok(index)
    }

    /// Record how many slots the claim owning `index` registered in its body.
    pub fn set_nested(&mut self, index: usize, nested: usize) -> Result<(), ClaimError> {
        self.require_phase(Phase::Registering, "register")?;
        let slot = self.slots.get_mut(index).ok_or(ClaimError::SlotMismatch { index })?;
        slot.nested = nested;
        Ok(())
    }

    /// Run the assignment engine over the registered slots.
    pub fn assign(&mut self) -> Result<(), ClaimError> {
        self.require_phase(Phase::Registering, "assign")?;

        let matchers: Vec<Vec<Matcher>> = self.slots.iter().map(|s| s.matchers.clone()).collect();
        let assignment = match assign(&self.fields, &matchers).and_then(|a| {
            check_nesting(&self.slots, &a.slots)?;
            Ok(a)
        }) {
            Ok(assignment) => assignment,
            Err(err) => {
                self.phase = Phase::Failed;
                debug!(record = %self.record, error = %err, "scope_failed");
                return Err(err);
            }
        };

        for (slot, fields) in self.slots.iter_mut().zip(assignment.slots) {
            slot.assigned = fields;
        }
        self.matched = assignment.matched;
        self.steps = assignment.steps;
        self.assign_duration = assignment.duration;
        self.phase = Phase::Assigned;

        debug!(
            record = %self.record,
            slots = self.slots.len(),
            fields = self.fields.len(),
            matched = self.matched.len(),
            "scope_assigned"
        );
        Ok(())
    }

    pub fn begin_rendering(&mut self) -> Result<(), ClaimError> {
        self.require_phase(Phase::Assigned, "render")?;
        self.phase = Phase::Rendering;
        Ok(())
    }

    /// Index of the slot the next executing claim owns.
    pub fn next_slot(&self) -> Result<usize, ClaimError> {
        self.require_phase(Phase::Rendering, "claim")?;
        if self.cursor < self.slots.len() {
            Ok(self.cursor)
        } else {
            Err(ClaimError::SlotMismatch { index: self.cursor })
        }
    }

    /// Drain the fields assigned to `index`.
    ///
    /// Slots are drained once each and strictly in registration order.
    pub fn assigned_fields_for(&mut self, index: usize) -> Result<Vec<Field>, ClaimError> {
        self.require_phase(Phase::Rendering, "claim")?;
        if index != self.cursor {
            return Err(ClaimError::SlotMismatch { index });
        }
        let slot = self.slots.get_mut(index).ok_or(ClaimError::SlotMismatch { index })?;
        slot.consumed = true;
        self.cursor += 1;
        Ok(std::mem::take(&mut slot.assigned))
    }

    /// Drain `count` slots without rendering them. Used when a claim with
    /// nested claims was assigned no field, so its body never runs.
    pub fn skip_slots(&mut self, count: usize) -> Result<(), ClaimError> {
        for _ in 0..count {
            let index = self.next_slot()?;
            self.assigned_fields_for(index)?;
        }
        Ok(())
    }

    /// Whether any matcher with this exact pattern text captured a field.
    ///
    /// The registry keys on the pattern as written, optional marker included:
    /// a field taken by `"title?"` is visible to a `"title?"` query but not to
    /// a plain `"title"` query. The catch-all is registered under `""`.
    pub fn is_pattern_matched(&self, pattern: &str) -> Result<bool, ClaimError> {
        self.require_phase(Phase::Rendering, "if_matched")?;
        Ok(self.matched.contains(pattern))
    }

    pub fn matched_patterns(&self) -> &BTreeSet<String> {
        &self.matched
    }

    /// Finish the Scope. Every slot must have been drained.
    pub fn close(mut self) -> Result<ScopeMetrics, ClaimError> {
        self.require_phase(Phase::Rendering, "close")?;
        if let Some(slot) = self.slots.iter().find(|s| !s.consumed) {
            return Err(ClaimError::SlotMismatch { index: slot.index });
        }
        self.phase = Phase::Closed;
        debug!(record = %self.record, "scope_closed");

        Ok(ScopeMetrics {
            record: self.record,
            fields: self.fields.len(),
            slots: self.slots.len(),
            steps: self.steps,
            matched: self.matched.into_iter().collect(),
            assign: self.assign_duration,
            total: self.opened.elapsed(),
        })
    }
}

/// A claim with nested claims renders its body once per assigned field, but
/// its nested slots were registered only once. It must therefore take exactly
/// one field, or none if its nested claims took none either.
fn check_nesting(slots: &[ClaimSlot], assigned: &[Vec<Field>]) -> Result<(), ClaimError> {
    for slot in slots.iter().filter(|s| s.nested > 0) {
        let matched = assigned[slot.index].len();
        let nested_range = slot.index + 1..slot.index + 1 + slot.nested;
        let nested_took = assigned[nested_range].iter().any(|fields| !fields.is_empty());
        if matched > 1 || (matched == 0 && nested_took) {
            return Err(ClaimError::NestedClaimOverflow { pattern: slot.label(), matched });
        }
    }
    Ok(())
}

/// Stack of open Scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope) {
        self.frames.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Phase of the innermost Scope, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.frames.last().map(Scope::phase)
    }

    /// Innermost Scope, or a `Scope` error naming `construct`.
    pub fn current(&self, construct: &'static str) -> Result<&Scope, ClaimError> {
        self.frames.last().ok_or(ClaimError::scope(construct))
    }

    pub fn current_mut(&mut self, construct: &'static str) -> Result<&mut Scope, ClaimError> {
        self.frames.last_mut().ok_or(ClaimError::scope(construct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn simple() -> Record {
        Record::new(["textfield", "textfield2", "numberfield", "numberfield2"]).with_hidden(["hidden1"])
    }

    fn parse(patterns: &[&str]) -> Vec<Matcher> {
        if patterns.is_empty() {
            return vec![Matcher::any()];
        }
        patterns.iter().map(|p| Matcher::parse(p).unwrap()).collect()
    }

    #[test]
    fn full_lifecycle() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        assert_eq!(scope.phase(), Phase::Registering);
        assert_eq!(scope.hidden_fields(), ["hidden1".to_string()]);
        assert_eq!(scope.fields().len(), 4);
        assert_eq!(scope.fields()[2].position, 2);

        assert_eq!(scope.register(parse(&[])).unwrap(), 0);
        assert_eq!(scope.register(parse(&["textfield"])).unwrap(), 1);
        scope.assign().unwrap();
        assert_eq!(scope.phase(), Phase::Assigned);

        scope.begin_rendering().unwrap();
        let matched: Vec<&str> = scope.matched_patterns().iter().map(String::as_str).collect();
        assert_eq!(matched, vec!["", "textfield"]);
        assert!(scope.is_pattern_matched("textfield").unwrap());
        assert!(scope.is_pattern_matched("").unwrap());
        assert!(!scope.is_pattern_matched("textfield2").unwrap());

        let first = scope.next_slot().unwrap();
        let names: Vec<String> = scope.assigned_fields_for(first).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["textfield2", "numberfield", "numberfield2"]);

        let second = scope.next_slot().unwrap();
        assert_eq!(second, 1);
        assert_eq!(scope.assigned_fields_for(second).unwrap().len(), 1);

        assert_eq!(scope.next_slot(), Err(ClaimError::SlotMismatch { index: 2 }));
        let metrics = scope.close().unwrap();
        assert_eq!(metrics.record, "form");
        assert_eq!(metrics.slots, 2);
        assert_eq!(metrics.steps.len(), 2);
        assert_eq!(metrics.matched, vec!["".to_string(), "textfield".to_string()]);
    }

    #[test]
    fn operations_check_phase() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        assert_eq!(scope.is_pattern_matched("x"), Err(ClaimError::Scope { construct: "if_matched" }));
        assert_eq!(scope.next_slot(), Err(ClaimError::Scope { construct: "claim" }));
        assert_eq!(scope.begin_rendering(), Err(ClaimError::Scope { construct: "render" }));

        scope.register(parse(&[])).unwrap();
        scope.assign().unwrap();
        assert_eq!(scope.register(parse(&[])), Err(ClaimError::Scope { construct: "register" }));
        assert_eq!(scope.assign(), Err(ClaimError::Scope { construct: "assign" }));
    }

    #[test]
    fn slots_drain_once_in_order() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        scope.register(parse(&["text*"])).unwrap();
        scope.register(parse(&[])).unwrap();
        scope.assign().unwrap();
        scope.begin_rendering().unwrap();

        assert_eq!(scope.assigned_fields_for(1), Err(ClaimError::SlotMismatch { index: 1 }));
        scope.assigned_fields_for(0).unwrap();
        assert_eq!(scope.assigned_fields_for(0), Err(ClaimError::SlotMismatch { index: 0 }));
        assert!(!scope.slot(1).unwrap().is_consumed());
    }

    #[test]
    fn close_requires_all_slots_drained() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        scope.register(parse(&["text*"])).unwrap();
        scope.register(parse(&[])).unwrap();
        scope.assign().unwrap();
        scope.begin_rendering().unwrap();
        scope.assigned_fields_for(0).unwrap();
        assert_eq!(scope.close().unwrap_err(), ClaimError::SlotMismatch { index: 1 });
    }

    #[test]
    fn failed_assignment_is_terminal() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        scope.register(parse(&["does_not_exist"])).unwrap();
        scope.register(parse(&[])).unwrap();
        assert_eq!(scope.assign(), Err(ClaimError::RequiredMatchFailed { pattern: "does_not_exist".to_string() }));
        assert_eq!(scope.phase(), Phase::Failed);
        assert_eq!(scope.begin_rendering(), Err(ClaimError::Scope { construct: "render" }));
    }

    #[test]
    fn nested_claim_must_take_one_field() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        let parent = scope.register(parse(&["text*"])).unwrap();
        scope.register(parse(&["numberfield"])).unwrap();
        scope.set_nested(parent, 1).unwrap();
        scope.register(parse(&[])).unwrap();
        assert_eq!(scope.assign(), Err(ClaimError::NestedClaimOverflow { pattern: "text*".to_string(), matched: 2 }));
    }

    #[test]
    fn nested_claim_with_no_field_and_empty_children_is_skipped() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        let parent = scope.register(parse(&["missing?"])).unwrap();
        scope.register(parse(&["other?"])).unwrap();
        scope.set_nested(parent, 1).unwrap();
        scope.register(parse(&[])).unwrap();
        scope.assign().unwrap();
        scope.begin_rendering().unwrap();

        let index = scope.next_slot().unwrap();
        let nested = scope.slot(index).unwrap().nested;
        assert!(scope.assigned_fields_for(index).unwrap().is_empty());
        scope.skip_slots(nested).unwrap();
        assert_eq!(scope.next_slot().unwrap(), 2);
        assert_eq!(scope.assigned_fields_for(2).unwrap().len(), 4);
        assert!(scope.close().is_ok());
    }

    #[test]
    fn nested_claim_with_no_field_but_busy_children_fails() {
        let mut scope = Scope::open("form", &simple()).unwrap();
        let parent = scope.register(parse(&["missing?"])).unwrap();
        scope.register(parse(&["numberfield"])).unwrap();
        scope.set_nested(parent, 1).unwrap();
        scope.register(parse(&[])).unwrap();
        assert_eq!(
            scope.assign(),
            Err(ClaimError::NestedClaimOverflow { pattern: "missing?".to_string(), matched: 0 })
        );
    }

    #[test]
    fn duplicate_names_fail_on_open() {
        let err = Scope::open("form", &Record::new(["a", "b", "a"])).unwrap_err();
        assert_eq!(err, ClaimError::DuplicateField { name: "a".to_string() });
    }

    #[test]
    fn stack_reports_missing_scope() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.phase(), None);
        assert_eq!(stack.current("claim").unwrap_err(), ClaimError::Scope { construct: "claim" });

        stack.push(Scope::open("outer", &simple()).unwrap());
        stack.push(Scope::open("inner", &Record::new(["x"])).unwrap());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current("claim").unwrap().record(), "inner");
        assert_eq!(stack.pop().unwrap().record(), "inner");
        assert_eq!(stack.current_mut("claim").unwrap().record(), "outer");
        assert_eq!(stack.phase(), Some(Phase::Registering));
    }
}
