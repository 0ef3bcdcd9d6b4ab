use serde_derive::{Deserialize, Serialize};

use super::error::ModelError;

pub type TaskId = u64;

pub const MAX_TITLE_LEN: usize = 200;

/// Task is a unit of work tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub done: bool,
}

impl Task {
    pub fn new(id: TaskId, title: String) -> Task {
        Self {
            id,
            title,
            done: false,
        }
    }
}

/// Body of a task creation request.
///
/// A missing or `null` title is accepted here and rejected by [`NewTask::title`],
/// so that it surfaces as an invalid title rather than invalid json.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTask {
    #[serde(default)]
    pub title: Option<String>,
}

impl NewTask {
    /// Returns the trimmed title, or an error when it is empty or too long.
    pub fn title(&self) -> Result<String, ModelError> {
        let title = self.title.as_deref().unwrap_or_default().trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(ModelError::InvalidTitle(title.chars().count()));
        }
        Ok(title.to_string())
    }
}

/// Body of a done-flag update request. `done` must be present and non-null.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoneUpdate {
    #[serde(default)]
    pub done: Option<bool>,
}

impl DoneUpdate {
    pub fn done(&self) -> Result<bool, ModelError> {
        self.done.ok_or(ModelError::MissingDone)
    }
}
