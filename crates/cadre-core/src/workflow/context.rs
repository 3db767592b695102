//! Per-run context: input parameters and the append-only step output store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ParamValue;

/// The recorded output of one completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// The actor's raw textual output.
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

impl StepOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Address a named portion of the output record, as templates do with
    /// `{{ steps.<id>.<field> }}`.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "text" => Some(&self.text),
            _ => None,
        }
    }
}

/// Append-only, step-keyed record of outputs produced during a single run.
///
/// The store holds every completed step's output; visibility restriction to
/// a step's `context_from` happens when the executor builds the rendering
/// scope, not here.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    outputs: BTreeMap<String, StepOutput>,
    order: Vec<String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed step's output. Step ids are unique within a task,
    /// so a repeat insert indicates an executor bug.
    pub fn record(&mut self, step_id: &str, text: String) {
        debug_assert!(
            !self.outputs.contains_key(step_id),
            "step output recorded twice: {step_id}"
        );
        self.outputs.insert(step_id.to_string(), StepOutput::new(text));
        self.order.push(step_id.to_string());
    }

    pub fn get(&self, step_id: &str) -> Option<&StepOutput> {
        self.outputs.get(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.outputs.contains_key(step_id)
    }

    /// Step ids in completion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Consume the store into a step-id → output-text mapping.
    pub fn into_texts(self) -> BTreeMap<String, String> {
        self.outputs
            .into_iter()
            .map(|(id, output)| (id, output.text))
            .collect()
    }
}

/// State owned by exactly one executor invocation. Created fresh per run,
/// destroyed when the run ends.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub inputs: BTreeMap<String, ParamValue>,
    pub store: ContextStore,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(inputs: BTreeMap<String, ParamValue>) -> Self {
        Self {
            run_id: format!("run_{}", Uuid::new_v4().simple()),
            inputs,
            store: ContextStore::new(),
            started_at: Utc::now(),
        }
    }
}
