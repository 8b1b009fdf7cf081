//! Construct tree.
//!
//! The host templating system is responsible for parsing its own syntax; this
//! crate only needs the shape of the tree that results from it. A
//! [`Template`] is an ordered list of [`Construct`]s, and the render driver
//! (`engine/render.rs`) executes that list once per phase.
//!
//! ```text
//! Record("form")
//!   ├─ Claim ["title"]      -> slot 0
//!   │    └─ Claim ["sub?"]  -> slot 1 (nested, same scope)
//!   ├─ IfMatched ["email"]  -> reads the match registry only
//!   └─ Claim []             -> slot 2 (catch-all)
//! ```

use crate::{ClaimError, Context};

bitflags::bitflags! {
    /// Kinds of constructs present in a subtree of one Scope.
    ///
    /// Nested records are reported as `RECORD` but not descended into: their
    /// contents belong to a different Scope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConstructSet: u8 {
        const TEXT   = 1 << 0;
        const VAR    = 1 << 1;
        const CLAIM  = 1 << 2;
        const QUERY  = 1 << 3;
        const RECORD = 1 << 4;
        const HIDDEN = 1 << 5;
    }
}

/// A pattern as declared on a construct: either literal text or the name of
/// a context variable holding the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternExpr {
    Literal(String),
    Variable(String),
}

impl PatternExpr {
    pub fn var(name: impl Into<String>) -> Self {
        PatternExpr::Variable(name.into())
    }

    /// Resolve to concrete pattern text.
    pub(crate) fn resolve(&self, context: &Context) -> Result<String, ClaimError> {
        match self {
            PatternExpr::Literal(text) => Ok(text.clone()),
            PatternExpr::Variable(name) => context
                .variable(name)
                .map(str::to_string)
                .ok_or_else(|| ClaimError::UnresolvedPattern { variable: name.clone() }),
        }
    }
}

impl From<&str> for PatternExpr {
    fn from(text: &str) -> Self {
        PatternExpr::Literal(text.to_string())
    }
}

impl From<String> for PatternExpr {
    fn from(text: String) -> Self {
        PatternExpr::Literal(text)
    }
}

/// A claim construct: its patterns (empty means catch-all), the name each
/// assigned field is bound to while the body renders, and the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub patterns: Vec<PatternExpr>,
    pub binding: String,
    pub body: Vec<Construct>,
}

impl Claim {
    /// Human-readable pattern list, used in errors and reports.
    pub(crate) fn label(&self) -> String {
        if self.patterns.is_empty() {
            return "<any>".to_string();
        }
        self.patterns
            .iter()
            .map(|p| match p {
                PatternExpr::Literal(text) => text.clone(),
                PatternExpr::Variable(name) => format!("${name}"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    /// Literal output.
    Text(String),
    /// Name of the field bound under this name, or a context variable.
    Var(String),
    Claim(Claim),
    /// Render `then` if any of `patterns` captured at least one field in the
    /// current Scope, else `otherwise`.
    IfMatched { patterns: Vec<PatternExpr>, then: Vec<Construct>, otherwise: Vec<Construct> },
    /// Open a new Scope over the named context record.
    Record { source: String, body: Vec<Construct> },
    /// Names of the current record's hidden fields.
    HiddenFields,
}

impl Construct {
    pub fn text(text: impl Into<String>) -> Self {
        Construct::Text(text.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Construct::Var(name.into())
    }

    pub fn record(source: impl Into<String>, body: Vec<Construct>) -> Self {
        Construct::Record { source: source.into(), body }
    }

    pub fn if_matched<P>(patterns: Vec<P>, then: Vec<Construct>, otherwise: Vec<Construct>) -> Self
    where
        P: Into<PatternExpr>,
    {
        Construct::IfMatched { patterns: patterns.into_iter().map(Into::into).collect(), then, otherwise }
    }

    /// Kinds of constructs in this subtree, stopping at nested records.
    pub fn contents(&self) -> ConstructSet {
        match self {
            Construct::Text(_) => ConstructSet::TEXT,
            Construct::Var(_) => ConstructSet::VAR,
            Construct::Claim(claim) => ConstructSet::CLAIM | contents_of(&claim.body),
            Construct::IfMatched { then, otherwise, .. } => {
                ConstructSet::QUERY | contents_of(then) | contents_of(otherwise)
            }
            Construct::Record { .. } => ConstructSet::RECORD,
            Construct::HiddenFields => ConstructSet::HIDDEN,
        }
    }
}

pub(crate) fn contents_of(nodes: &[Construct]) -> ConstructSet {
    nodes.iter().fold(ConstructSet::empty(), |acc, node| acc | node.contents())
}

/// A validated construct tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    body: Vec<Construct>,
}

impl Template {
    /// Validate and wrap a construct list.
    ///
    /// A claim inside a match query of the same Scope is rejected: the query
    /// does not run during registration, so such a claim would never get a
    /// slot of its own.
    pub fn new(body: Vec<Construct>) -> Result<Self, ClaimError> {
        validate(&body)?;
        Ok(Template { body })
    }

    pub fn body(&self) -> &[Construct] {
        &self.body
    }
}

fn validate(nodes: &[Construct]) -> Result<(), ClaimError> {
    for node in nodes {
        match node {
            Construct::Claim(claim) => validate(&claim.body)?,
            Construct::IfMatched { then, otherwise, .. } => {
                if (contents_of(then) | contents_of(otherwise)).contains(ConstructSet::CLAIM) {
                    return Err(ClaimError::MisplacedClaim);
                }
                validate(then)?;
                validate(otherwise)?;
            }
            Construct::Record { body, .. } => validate(body)?,
            Construct::Text(_) | Construct::Var(_) | Construct::HiddenFields => {}
        }
    }
    Ok(())
}
