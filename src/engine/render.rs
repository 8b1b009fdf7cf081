//! Two-pass construct executor.
//!
//! Every construct is executed through [`Renderer::execute`], which asks the
//! innermost Scope which phase it is in:
//!
//! ```text
//! phase        Claim                      Text/Var   Query/Hidden  Record
//! -----------  -------------------------  ---------  ------------  -------------
//! no scope     Scope error                render     Scope error   open + run
//! Registering  resolve, register slot,    Discarded  Discarded     Discarded
//!              run body (nested claims)                            (not entered)
//! Rendering    drain next slot, run body  render     render        open + run
//!              once per field
//! ```
//!
//! Registration never produces output: it returns [`Output::Discarded`], so
//! the only effect pass 1 can have is slot registration.

use tracing::{debug, trace};

use super::metrics::ScopeMetrics;
use super::scope::{Phase, Scope, ScopeStack};
use crate::{Claim, ClaimError, Construct, Context, Matcher, Options, PatternExpr};

/// Result of executing constructs in one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Output {
    /// Registration pass: nothing to show.
    Discarded,
    Text(String),
}

impl Output {
    pub(crate) fn into_text(self) -> String {
        match self {
            Output::Discarded => String::new(),
            Output::Text(text) => text,
        }
    }
}

pub(crate) struct Renderer<'a> {
    context: &'a Context,
    options: &'a Options,
    scopes: ScopeStack,
    /// Claim bindings, innermost last.
    bindings: Vec<(String, String)>,
    metrics: Vec<ScopeMetrics>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(context: &'a Context, options: &'a Options) -> Self {
        Renderer { context, options, scopes: ScopeStack::new(), bindings: Vec::new(), metrics: Vec::new() }
    }

    /// Metrics of every Scope closed so far.
    pub(crate) fn into_metrics(self) -> Vec<ScopeMetrics> {
        self.metrics
    }

    fn registering(&self) -> bool {
        self.scopes.phase() == Some(Phase::Registering)
    }

    pub(crate) fn execute_all(&mut self, nodes: &[Construct]) -> Result<Output, ClaimError> {
        if self.registering() {
            for node in nodes {
                self.execute(node)?;
            }
            return Ok(Output::Discarded);
        }

        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.execute(node)?.into_text());
        }
        Ok(Output::Text(out))
    }

    fn execute(&mut self, node: &Construct) -> Result<Output, ClaimError> {
        match node {
            Construct::Claim(claim) => self.execute_claim(claim),
            Construct::Record { source, body } => self.execute_record(source, body),
            Construct::IfMatched { patterns, then, otherwise } => self.execute_query(patterns, then, otherwise),
            Construct::HiddenFields => {
                let scope = self.scopes.current("hidden_fields")?;
                match scope.phase() {
                    Phase::Registering => Ok(Output::Discarded),
                    Phase::Rendering => Ok(Output::Text(scope.hidden_fields().join(&self.options.hidden_separator))),
                    _ => Err(ClaimError::scope("hidden_fields")),
                }
            }
            Construct::Text(_) | Construct::Var(_) if self.registering() => Ok(Output::Discarded),
            Construct::Text(text) => Ok(Output::Text(text.clone())),
            Construct::Var(name) => Ok(Output::Text(self.lookup(name).unwrap_or_default())),
        }
    }

    /// Bound field name first (innermost claim wins), then context variables.
    fn lookup(&self, name: &str) -> Option<String> {
        self.bindings
            .iter()
            .rev()
            .find(|(binding, _)| binding == name)
            .map(|(_, value)| value.clone())
            .or_else(|| self.context.variable(name).map(str::to_string))
    }

    fn resolve_matchers(&self, claim: &Claim) -> Result<Vec<Matcher>, ClaimError> {
        if claim.patterns.is_empty() {
            return Ok(vec![Matcher::any()]);
        }
        claim.patterns.iter().map(|p| Matcher::parse(&p.resolve(self.context)?)).collect()
    }

    fn execute_claim(&mut self, claim: &Claim) -> Result<Output, ClaimError> {
        match self.scopes.current("claim")?.phase() {
            Phase::Registering => {
                let matchers = self.resolve_matchers(claim)?;
                let index = self.scopes.current_mut("claim")?.register(matchers)?;
                trace!(slot = index, claim = %claim.label(), "claim_registered");

                // The field count is unknown yet, so the body always runs once
                // to let nested claims register their own slots.
                self.execute_all(&claim.body)?;

                let scope = self.scopes.current_mut("claim")?;
                let nested = scope.slots().len() - index - 1;
                scope.set_nested(index, nested)?;
                Ok(Output::Discarded)
            }
            Phase::Rendering => {
                let scope = self.scopes.current_mut("claim")?;
                let index = scope.next_slot()?;
                let nested = scope.slot(index).map_or(0, |slot| slot.nested);
                let fields = scope.assigned_fields_for(index)?;
                if fields.is_empty() {
                    scope.skip_slots(nested)?;
                    return Ok(Output::Text(String::new()));
                }

                let mut parts = Vec::with_capacity(fields.len());
                for field in fields {
                    self.bindings.push((claim.binding.clone(), field.name));
                    let rendered = self.execute_all(&claim.body);
                    self.bindings.pop();
                    parts.push(rendered?.into_text());
                }
                Ok(Output::Text(parts.join(&self.options.field_separator)))
            }
            _ => Err(ClaimError::scope("claim")),
        }
    }

    fn execute_query(
        &mut self,
        patterns: &[PatternExpr],
        then: &[Construct],
        otherwise: &[Construct],
    ) -> Result<Output, ClaimError> {
        let scope = self.scopes.current("if_matched")?;
        if scope.phase() == Phase::Registering {
            return Ok(Output::Discarded);
        }

        let mut matched = false;
        for pattern in patterns {
            if scope.is_pattern_matched(&pattern.resolve(self.context)?)? {
                matched = true;
                break;
            }
        }

        self.execute_all(if matched { then } else { otherwise })
    }

    fn execute_record(&mut self, source: &str, body: &[Construct]) -> Result<Output, ClaimError> {
        // A nested record has its own Scope and cannot add slots to the
        // enclosing one; it runs only when the enclosing Scope renders.
        if self.registering() {
            return Ok(Output::Discarded);
        }

        let record = self.context.record(source).ok_or_else(|| ClaimError::UnknownRecord { name: source.to_string() })?;
        self.scopes.push(Scope::open(source, record)?);
        debug!(record = source, depth = self.scopes.depth(), "record_entered");

        let result = self.run_scope(body);
        let scope = self.scopes.pop().ok_or(ClaimError::scope("record"))?;
        let out = result?;

        self.metrics.push(scope.close()?);
        Ok(Output::Text(out))
    }

    fn run_scope(&mut self, body: &[Construct]) -> Result<String, ClaimError> {
        self.execute_all(body)?;
        self.scopes.current_mut("record")?.assign()?;
        self.scopes.current_mut("record")?.begin_rendering()?;
        Ok(self.execute_all(body)?.into_text())
    }
}
