//! Greedy field assignment.
//!
//! Input is one Scope's fields (in display order) and its claim slots (in
//! registration order), each slot holding one or more matchers. Output is the
//! list of fields assigned to each slot.
//!
//! ```text
//! slots:  0:[<any>]  1:["text*"]  2:["numberfield2"]
//!
//! flatten + stable sort by precedence
//!   (2, "numberfield2", 0) (1, "text*", 11) (0, <any>, 99)
//!
//! pool [textfield textfield2 numberfield numberfield2]
//!   "numberfield2" takes numberfield2     -> slot 2
//!   "text*"        takes textfield, ...2  -> slot 1
//!   <any>          takes numberfield      -> slot 0
//! pool [] -> ok
//! ```
//!
//! ## Invariants
//!
//! - Matchers run in ascending precedence; ties keep registration order.
//! - A taken field leaves the pool immediately; nothing is revisited.
//! - Relative matchers compare against the original positions, not the
//!   shrinking pool.
//! - Every field ends up in exactly one slot or assignment fails with
//!   `LeftoverFields`.
//! - The result depends only on the inputs: no hashing order is observable.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::metrics::AssignStep;
use crate::{ClaimError, Field, Matcher, PositionIndex};

/// Result of a successful assignment.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Assigned fields per slot, indexed like the input slots.
    pub slots: Vec<Vec<Field>>,
    /// Pattern text of every matcher that took at least one field.
    pub matched: BTreeSet<String>,
    /// Matcher turns in processing order.
    pub steps: Vec<AssignStep>,
    pub duration: Duration,
}

/// Turn an ordered list of names into positioned fields.
pub(crate) fn fields_from_names(names: Vec<String>) -> Result<Vec<Field>, ClaimError> {
    let mut seen = BTreeSet::new();
    let mut fields = Vec::with_capacity(names.len());
    for (position, name) in names.into_iter().enumerate() {
        if !seen.insert(name.clone()) {
            return Err(ClaimError::DuplicateField { name });
        }
        fields.push(Field { name, position });
    }
    Ok(fields)
}

/// Assign every field to exactly one slot.
///
/// Errors:
/// - `DuplicateField` if two fields share a name.
/// - `UnknownOperand` if a relative matcher names a field that does not exist.
/// - `RequiredMatchFailed` if a required matcher takes nothing.
/// - `LeftoverFields` if fields remain after the last matcher.
pub fn assign(fields: &[Field], slots: &[Vec<Matcher>]) -> Result<Assignment, ClaimError> {
    let start = Instant::now();

    let mut index = PositionIndex::with_capacity(fields.len());
    for field in fields {
        if index.insert(field.name.clone(), field.position).is_some() {
            return Err(ClaimError::DuplicateField { name: field.name.clone() });
        }
    }

    // `sort_by_key` is stable: equal precedence keeps registration order.
    let mut order: Vec<(usize, &Matcher)> =
        slots.iter().enumerate().flat_map(|(slot, matchers)| matchers.iter().map(move |m| (slot, m))).collect();
    order.sort_by_key(|(_, m)| m.precedence());

    let mut pool: Vec<Field> = fields.to_vec();
    let mut assigned: Vec<Vec<Field>> = vec![Vec::new(); slots.len()];
    let mut matched = BTreeSet::new();
    let mut steps = Vec::with_capacity(order.len());

    for (slot, matcher) in order {
        if let Err(err) = matcher.validate(&index) {
            debug!(slot, pattern = %matcher, error = %err, "assign_failed");
            return Err(err);
        }

        let taken = take(&mut pool, &index, matcher)?;
        trace!(
            slot,
            pattern = %matcher,
            precedence = matcher.precedence(),
            taken = taken.len(),
            remaining = pool.len(),
            "assign_step"
        );

        if taken.is_empty() {
            if matcher.is_required() {
                debug!(slot, pattern = %matcher, "assign_failed_required");
                return Err(ClaimError::RequiredMatchFailed { pattern: matcher.pattern_text().to_string() });
            }
        } else {
            matched.insert(matcher.pattern_text().to_string());
        }

        steps.push(AssignStep {
            slot,
            pattern: matcher.pattern_text().to_string(),
            precedence: matcher.precedence(),
            taken: taken.iter().map(|f| f.name.clone()).collect(),
        });
        assigned[slot].extend(taken);
    }

    if !pool.is_empty() {
        let names: Vec<String> = pool.into_iter().map(|f| f.name).collect();
        debug!(leftover = ?names, "assign_failed_leftover");
        return Err(ClaimError::LeftoverFields { names });
    }

    Ok(Assignment { slots: assigned, matched, steps, duration: start.elapsed() })
}

/// Split `pool` into the fields `matcher` takes and the ones it leaves,
/// preserving relative order in both.
fn take(pool: &mut Vec<Field>, index: &PositionIndex, matcher: &Matcher) -> Result<Vec<Field>, ClaimError> {
    let mut taken = Vec::new();
    let mut kept = Vec::with_capacity(pool.len());
    for field in std::mem::take(pool) {
        if matcher.matches(&field, index)? {
            taken.push(field);
        } else {
            kept.push(field);
        }
    }
    *pool = kept;
    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: [&str; 4] = ["textfield", "textfield2", "numberfield", "numberfield2"];

    fn simple_fields() -> Vec<Field> {
        fields_from_names(SIMPLE.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn slots(claims: &[&[&str]]) -> Vec<Vec<Matcher>> {
        claims
            .iter()
            .map(|patterns| {
                if patterns.is_empty() {
                    vec![Matcher::any()]
                } else {
                    patterns.iter().map(|p| Matcher::parse(p).unwrap()).collect()
                }
            })
            .collect()
    }

    fn names(fields: &[Field]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn precedence_beats_registration_order() {
        let fields = simple_fields();

        let any_first = assign(&fields, &slots(&[&[], &["textfield"]])).unwrap();
        assert_eq!(names(&any_first.slots[1]), vec!["textfield"]);
        assert_eq!(names(&any_first.slots[0]), vec!["textfield2", "numberfield", "numberfield2"]);

        let exact_first = assign(&fields, &slots(&[&["textfield"], &[]])).unwrap();
        assert_eq!(names(&exact_first.slots[0]), vec!["textfield"]);
        assert_eq!(names(&exact_first.slots[1]), vec!["textfield2", "numberfield", "numberfield2"]);
    }

    #[test]
    fn prefix_wildcard_with_catch_all() {
        let result = assign(&simple_fields(), &slots(&[&["text*"], &[]])).unwrap();
        assert_eq!(names(&result.slots[0]), vec!["textfield", "textfield2"]);
        assert_eq!(names(&result.slots[1]), vec!["numberfield", "numberfield2"]);
        assert!(result.matched.contains("text*"));
    }

    #[test]
    fn suffix_wildcard_outranks_prefix() {
        let result = assign(&simple_fields(), &slots(&[&["number*"], &["*field2"], &[]])).unwrap();
        assert_eq!(names(&result.slots[1]), vec!["textfield2", "numberfield2"]);
        assert_eq!(names(&result.slots[0]), vec!["numberfield"]);
        assert_eq!(names(&result.slots[2]), vec!["textfield"]);
    }

    #[test]
    fn optional_missing_is_not_an_error() {
        let result = assign(&simple_fields(), &slots(&[&["does_not_exist?"], &[]])).unwrap();
        assert!(result.slots[0].is_empty());
        assert_eq!(names(&result.slots[1]), SIMPLE.to_vec());
        assert!(!result.matched.contains("does_not_exist?"));
        assert!(!result.matched.contains("does_not_exist"));
    }

    #[test]
    fn required_missing_fails() {
        let err = assign(&simple_fields(), &slots(&[&["does_not_exist"], &[]])).unwrap_err();
        assert_eq!(err, ClaimError::RequiredMatchFailed { pattern: "does_not_exist".to_string() });

        let err = assign(&simple_fields(), &slots(&[&["nonexistent*"], &[]])).unwrap_err();
        assert_eq!(err, ClaimError::RequiredMatchFailed { pattern: "nonexistent*".to_string() });
    }

    #[test]
    fn leftover_fields_fail() {
        let err = assign(&simple_fields(), &slots(&[&["textfield"]])).unwrap_err();
        assert_eq!(
            err,
            ClaimError::LeftoverFields {
                names: vec!["textfield2".to_string(), "numberfield".to_string(), "numberfield2".to_string()]
            }
        );
    }

    #[test]
    fn relative_matchers() {
        let result = assign(&simple_fields(), &slots(&[&["<textfield2"], &[]])).unwrap();
        assert_eq!(names(&result.slots[0]), vec!["textfield"]);

        let result = assign(&simple_fields(), &slots(&[&[">=numberfield"], &[]])).unwrap();
        assert_eq!(names(&result.slots[0]), vec!["numberfield", "numberfield2"]);
    }

    #[test]
    fn relative_operand_uses_original_positions() {
        // "textfield2" is taken first, yet "<=textfield2" still compares
        // against its original position.
        let result = assign(&simple_fields(), &slots(&[&["<=textfield2"], &["textfield2"], &[]])).unwrap();
        assert_eq!(names(&result.slots[1]), vec!["textfield2"]);
        assert_eq!(names(&result.slots[0]), vec!["textfield"]);
        assert_eq!(names(&result.slots[2]), vec!["numberfield", "numberfield2"]);
    }

    #[test]
    fn relative_unknown_operand_fails_even_with_empty_pool() {
        let err = assign(&simple_fields(), &slots(&[&[], &[">missing"]])).unwrap_err();
        assert_eq!(err, ClaimError::UnknownOperand { name: "missing".to_string() });
    }

    #[test]
    fn mixed_precedence_ladder() {
        let result = assign(
            &simple_fields(),
            &slots(&[
                &[],
                &["<=numberfield2"],
                &[">textfield"],
                &["numberfield*"],
                &["numberfield2?"],
                &["numberfield2"],
            ]),
        )
        .unwrap();
        assert!(result.slots[0].is_empty());
        assert_eq!(names(&result.slots[1]), vec!["textfield", "textfield2"]);
        assert!(result.slots[2].is_empty());
        assert_eq!(names(&result.slots[3]), vec!["numberfield"]);
        assert!(result.slots[4].is_empty());
        assert_eq!(names(&result.slots[5]), vec!["numberfield2"]);

        let order: Vec<u16> = result.steps.iter().map(|s| s.precedence).collect();
        assert_eq!(order, vec![0, 2, 11, 50, 60, 99]);
    }

    #[test]
    fn equal_precedence_first_registered_wins() {
        let result = assign(&simple_fields(), &slots(&[&["*field2?"], &["*2?"], &[]])).unwrap();
        assert_eq!(names(&result.slots[0]), vec!["textfield2", "numberfield2"]);
        assert!(result.slots[1].is_empty());

        let result = assign(&simple_fields(), &slots(&[&["*2?"], &["*field2?"], &[]])).unwrap();
        assert_eq!(names(&result.slots[0]), vec!["textfield2", "numberfield2"]);
        assert!(result.slots[1].is_empty());
        assert!(!result.matched.contains("*field2?"));
    }

    #[test]
    fn multiple_matchers_share_one_slot() {
        let result = assign(&simple_fields(), &slots(&[&["numberfield2", "text*"], &[]])).unwrap();
        // Appended in matcher processing order, not field order.
        assert_eq!(names(&result.slots[0]), vec!["numberfield2", "textfield", "textfield2"]);
        assert_eq!(names(&result.slots[1]), vec!["numberfield"]);
    }

    #[test]
    fn completeness_and_determinism() {
        let claims = slots(&[&["<numberfield"], &["*2?"], &["numberfield"], &[]]);
        let first = assign(&simple_fields(), &claims).unwrap();
        let second = assign(&simple_fields(), &claims).unwrap();
        assert_eq!(first.slots, second.slots);
        assert_eq!(first.matched, second.matched);

        let mut all: Vec<&str> = first.slots.iter().flat_map(|s| names(s)).collect();
        all.sort_unstable();
        let mut expected = SIMPLE.to_vec();
        expected.sort_unstable();
        assert_eq!(all, expected);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let err = fields_from_names(vec!["a".to_string(), "a".to_string()]).unwrap_err();
        assert_eq!(err, ClaimError::DuplicateField { name: "a".to_string() });

        let fields =
            vec![Field { name: "a".to_string(), position: 0 }, Field { name: "a".to_string(), position: 1 }];
        assert_eq!(assign(&fields, &slots(&[&[]])).unwrap_err(), ClaimError::DuplicateField { name: "a".to_string() });
    }

    #[test]
    fn empty_record_with_catch_all() {
        let result = assign(&[], &slots(&[&[]])).unwrap();
        assert_eq!(result.slots, vec![Vec::<Field>::new()]);
        assert!(result.matched.is_empty());
    }
}
