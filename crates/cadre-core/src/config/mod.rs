//! Configuration loading and the merged, immutable [`Configuration`].
//!
//! ```text
//! cadre.yaml ──imports──► ConfigLoader ──merge+validate──► Configuration
//!      │                        │
//!      └── fragments/*.yaml ────┘   (cycle + duplicate detection)
//! ```
//!
//! A `Configuration` is built once per load and shared read-only across any
//! number of task runs.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{AgentDef, TaskDef, ToolsCatalog};

/// Default configuration file name, discovered by [`find_default`].
pub const DEFAULT_FILE_NAME: &str = "cadre.yaml";

/// The fully merged result of loading a root document and all of its
/// transitive imports. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Configuration {
    root_dir: PathBuf,
    tools: ToolsCatalog,
    agents: BTreeMap<String, AgentDef>,
    tasks: BTreeMap<String, TaskDef>,
}

impl Configuration {
    /// Directory of the root document; task working directories resolve
    /// against it.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn tools(&self) -> &ToolsCatalog {
        &self.tools
    }

    pub fn agent(&self, id: &str) -> Option<&AgentDef> {
        self.agents.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskDef> {
        self.tasks.get(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentDef> {
        self.agents.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.values()
    }

    /// Absolute working directory for a task (default: the configuration
    /// root).
    pub fn task_working_dir(&self, task: &TaskDef) -> PathBuf {
        let dir = Path::new(&task.working_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root_dir.join(dir)
        }
    }
}

/// Search for [`DEFAULT_FILE_NAME`] from `start` upward, stopping at the
/// first directory containing `.git`.
pub fn find_default(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(DEFAULT_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.join(".git").exists() {
            return None;
        }
        current = dir.parent();
    }
    None
}
