//! Assignment and rendering engine.
//!
//! The engine is split into focused submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! Rendering a record is a two-pass protocol over the same construct tree:
//!
//! ```text
//! Record boundary ── Scope::open                 (scope.rs)
//!                       │   phase = Registering
//!                       v
//!         pass 1: execute tree (render.rs)
//!           - claims resolve patterns, register slots
//!           - everything else returns Output::Discarded
//!                       │
//!                       v
//!                 Scope::assign ── assign()      (assign.rs)
//!                       - sort matchers by precedence (stable)
//!                       - greedy take from the field pool
//!                       - required / leftover / nesting checks
//!                       │   phase = Assigned -> Rendering
//!                       v
//!         pass 2: execute tree again (render.rs)
//!           - each claim drains the next slot in registration order
//!           - body runs once per assigned field
//!                       │
//!                       v
//!                 Scope::close ── ScopeMetrics   (metrics.rs)
//! ```
//!
//! Scopes nest: a record boundary inside a claim body pushes a fresh Scope on
//! the `ScopeStack` and pops it when done. A child Scope never touches its
//! parent's slots or match registry.
//!
//! ## Responsibilities by module
//!
//! - `assign.rs`: the greedy, deterministic assignment algorithm.
//! - `scope.rs`: per-record state machine (`Phase`), claim slots, the match
//!   registry and the scope stack.
//! - `render.rs`: the construct executor that drives both passes.
//! - `metrics.rs`: assignment trace and timings for verbose runs.
//!
//! ## Debugging
//!
//! The engine emits `tracing` events: `debug` for scope lifecycle and
//! failures, `trace` for every assignment step.

#[path = "engine/assign.rs"]
mod assign;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/render.rs"]
mod render;
#[path = "engine/scope.rs"]
mod scope;


pub use assign::{Assignment, assign};
pub use metrics::{AssignStep, RenderMetrics, ScopeMetrics};
pub(crate) use render::Renderer;
pub use scope::{ClaimSlot, Phase, Scope, ScopeStack};

pub(crate) use assign::fields_from_names;
