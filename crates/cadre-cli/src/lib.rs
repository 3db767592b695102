//! Cadre CLI — command-line surface over the cadre-core engine.
//!
//! The binary stays thin: configuration loading, task selection, and run
//! reporting. Agent turns are executed by spawning a headless agent CLI
//! (see [`invoker::ProcessAgentInvoker`]); validation commands run through
//! the core's `ProcessCommandRunner`.

pub mod commands;
pub mod invoker;
