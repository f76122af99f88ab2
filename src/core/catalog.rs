//! Task Catalog
//!
//! Fixed, ordered list of task descriptors loaded once at startup.
//! The engine only ever reads it.

use std::collections::BTreeSet;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::id::TaskId;

/// Which role a task is handed out to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Real work done by Crewmates.
    Normal,
    /// Cover task handed to Impostors. Never counts toward progress.
    Sabotage,
}

/// A single catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Stable identifier.
    pub id: TaskId,
    /// Display title.
    pub title: String,
    /// Task kind.
    pub kind: TaskKind,
}

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File could not be read.
    #[error("failed to read task catalog: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid catalog JSON.
    #[error("failed to parse task catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// Catalog has no tasks of a required kind.
    #[error("task catalog has no {0:?} tasks")]
    MissingKind(TaskKind),
    /// Two entries share an id.
    #[error("duplicate task id {0}")]
    DuplicateId(TaskId),
}

/// Ordered, read-only collection of tasks.
#[derive(Clone, Debug)]
pub struct TaskCatalog {
    tasks: Vec<TaskDescriptor>,
}

const NORMAL_TASKS: [&str; 15] = [
    "Fix wiring",
    "Empty garbage",
    "Swipe card",
    "Calibrate distributor",
    "Align engine output",
    "Clear asteroids",
    "Divert power",
    "Download data",
    "Upload data",
    "Fuel engines",
    "Inspect sample",
    "Chart course",
    "Clean O2 filter",
    "Stabilize steering",
    "Start reactor",
];

const SABOTAGE_TASKS: [&str; 8] = [
    "Loiter by the door",
    "Check the vents",
    "Stare at the map",
    "Pretend to scan",
    "Fake a fuel run",
    "Idle at the console",
    "Linger in the corner",
    "Wander around",
];

/// Every default task exists once per room.
const ROOMS: [&str; 9] = [
    "Cafeteria",
    "Admin",
    "Electrical",
    "MedBay",
    "Navigation",
    "Reactor",
    "Security",
    "Storage",
    "Weapons",
];

impl TaskCatalog {
    /// Build a catalog from descriptors, validating ids and kinds.
    pub fn new(tasks: Vec<TaskDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for task in &tasks {
            if !seen.insert(task.id) {
                return Err(CatalogError::DuplicateId(task.id));
            }
        }
        for kind in [TaskKind::Normal, TaskKind::Sabotage] {
            if !tasks.iter().any(|t| t.kind == kind) {
                return Err(CatalogError::MissingKind(kind));
            }
        }
        Ok(Self { tasks })
    }

    /// Load a JSON array of descriptors from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse a JSON array of descriptors.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let tasks: Vec<TaskDescriptor> = serde_json::from_str(raw)?;
        Self::new(tasks)
    }

    /// All tasks in catalog order.
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    /// Tasks of one kind, in catalog order.
    pub fn of_kind(&self, kind: TaskKind) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().filter(move |t| t.kind == kind)
    }

    /// Look up a task by id.
    pub fn get(&self, id: TaskId) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if the catalog is empty (never the case once validated).
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks of one kind.
    pub fn count_of(&self, kind: TaskKind) -> usize {
        self.of_kind(kind).count()
    }
}

impl Default for TaskCatalog {
    fn default() -> Self {
        let normal = NORMAL_TASKS.iter().map(|title| (TaskKind::Normal, *title));
        let sabotage = SABOTAGE_TASKS.iter().map(|title| (TaskKind::Sabotage, *title));

        let tasks = normal
            .chain(sabotage)
            .flat_map(|(kind, title)| ROOMS.iter().map(move |room| (kind, title, *room)))
            .enumerate()
            .map(|(i, (kind, title, room))| TaskDescriptor {
                id: TaskId(i as u32 + 1),
                title: format!("{} ({})", title, room),
                kind,
            })
            .collect();

        Self { tasks }
    }
}
