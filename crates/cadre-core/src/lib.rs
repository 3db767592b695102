//! Cadre Core — configuration resolution and workflow execution engine.
//!
//! Cadre runs declarative, multi-step automation workflows: YAML documents
//! define external tools, permission-scoped agents, and ordered tasks; the
//! engine merges them into one immutable [`Configuration`] and executes a
//! selected task step by step, propagating context between steps and gating
//! progression on validation commands with bounded retry.
//!
//! ```text
//! cadre.yaml ──imports──► ConfigLoader ──► Configuration (read-only, shared)
//!                                               │
//!                                        WorkflowExecutor ──► RunResult
//!                                          │           │
//!                                    AgentInvoker  CommandRunner
//!                                    (actor turns) (validation gates)
//! ```
//!
//! Actor execution and validation-command execution are collaborator traits
//! ([`workflow::AgentInvoker`], [`workflow::CommandRunner`]); this crate has
//! no model-provider or transport dependency.

pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod workflow;

// Convenience re-exports
pub use config::{ConfigLoader, Configuration};
pub use error::{ConfigError, ExecutionError};
pub use workflow::{RunResult, TemplateError, WorkflowExecutor};
