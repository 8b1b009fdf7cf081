use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::engine::{self, Assignment, RenderMetrics, Renderer};
use crate::{ClaimError, FieldSource, Matcher, Template};

/// Host environment for a render.
///
/// Holds the records that record boundaries open Scopes over, and the
/// variables that late-bound patterns and `Var` constructs resolve against.
#[derive(Default)]
pub struct Context {
    records: HashMap<String, Box<dyn FieldSource>>,
    variables: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, name: impl Into<String>, record: impl FieldSource + 'static) -> Self {
        self.records.insert(name.into(), Box::new(record));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn record(&self, name: &str) -> Option<&dyn FieldSource> {
        self.records.get(name).map(|r| r.as_ref())
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut records: Vec<&String> = self.records.keys().collect();
        records.sort_unstable();
        f.debug_struct("Context").field("records", &records).field("variables", &self.variables).finish()
    }
}

/// Options that affect rendering.
#[derive(Debug, Clone)]
pub struct Options {
    /// Joins the per-field outputs of one claim.
    pub field_separator: String,
    /// Joins hidden field names.
    pub hidden_separator: String,
}

impl Default for Options {
    fn default() -> Self {
        Options { field_separator: "\n".to_string(), hidden_separator: "\n".to_string() }
    }
}

/// Result from [`render`] and [`render_with`].
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub output: String,
    /// Total elapsed time, both passes of every Scope included.
    pub elapsed: Duration,
}

/// Result from [`render_verbose_with`].
#[derive(Debug, Clone)]
pub struct RenderResultVerbose {
    pub output: String,
    pub elapsed: Duration,
    pub metrics: RenderMetrics,
}

/// Render `template` with default [`Options`].
///
/// # Example
/// ```
/// use fieldclaim::{Construct, Context, Record, Template, claim, render};
///
/// let template = Template::new(vec![Construct::record(
///     "form",
///     vec![
///         claim!(body: [Construct::var("field"), Construct::text(",")]),
///         claim!(patterns: ["title"], body: [Construct::text("TITLE,")]),
///     ],
/// )])
/// .unwrap();
/// let context = Context::new().with_record("form", Record::new(["title", "body", "tags"]));
///
/// let out = render(&template, &context).unwrap();
/// assert_eq!(out.output, "body,\ntags,TITLE,");
/// ```
pub fn render(template: &Template, context: &Context) -> Result<RenderResult, ClaimError> {
    render_with(template, context, &Options::default())
}

pub fn render_with(template: &Template, context: &Context, options: &Options) -> Result<RenderResult, ClaimError> {
    let run = render_verbose_with(template, context, options)?;
    Ok(RenderResult { output: run.output, elapsed: run.elapsed })
}

/// Render and also return per-Scope assignment traces and timings.
pub fn render_verbose_with(
    template: &Template,
    context: &Context,
    options: &Options,
) -> Result<RenderResultVerbose, ClaimError> {
    let start = Instant::now();
    let mut renderer = Renderer::new(context, options);
    let output = renderer.execute_all(template.body())?.into_text();
    let elapsed = start.elapsed();

    Ok(RenderResultVerbose {
        output,
        elapsed,
        metrics: RenderMetrics { total: elapsed, scopes: renderer.into_metrics() },
    })
}

/// Run the assignment engine directly over `source`.
///
/// Each claim is a list of raw patterns; an empty list is the catch-all.
pub fn assign_fields<S, C, P>(source: &S, claims: C) -> Result<Assignment, ClaimError>
where
    S: FieldSource + ?Sized,
    C: IntoIterator,
    C::Item: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let fields = engine::fields_from_names(source.visible_fields())?;
    let slots = claims
        .into_iter()
        .map(|patterns| {
            let matchers = patterns.into_iter().map(|p| Matcher::parse(p.as_ref())).collect::<Result<Vec<_>, _>>()?;
            Ok(if matchers.is_empty() { vec![Matcher::any()] } else { matchers })
        })
        .collect::<Result<Vec<_>, ClaimError>>()?;
    engine::assign(&fields, &slots)
}
