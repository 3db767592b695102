//! Workflow engine — sequential, validation-gated execution of task steps.
//!
//! ```text
//! Configuration ──task lookup──► WorkflowExecutor
//!                                     │
//!                     ┌───────────────┼──────────────────┐
//!                     ▼               ▼                  ▼
//!               TemplateScope    AgentInvoker      CommandRunner
//!               (inputs +        (actor turns,     (validation
//!                context_from)    policy+limits)    commands)
//!                     │               │
//!                     └──── ContextStore ◄── step outputs, in order
//! ```

pub mod context;
pub mod executor;
pub mod invoker;
pub mod result;
pub mod template;

pub use context::{ContextStore, RunContext, StepOutput};
pub use executor::WorkflowExecutor;
pub use invoker::{
    AgentInvoker, AgentOutput, CommandOutput, CommandRunner, InvocationError, InvocationRequest,
    ProcessCommandRunner, RunnerError,
};
pub use result::{RunResult, RunStatus, StepRecord, StepStatus};
pub use template::{render, TemplateError, TemplateScope};
