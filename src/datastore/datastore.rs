use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::model::{Task, TaskId};

/// Authoritative collection of tasks. Every method hands out copies, never references.
pub trait TaskDataStore: Send + Sync + 'static {
    fn add(&self, title: String) -> Task;
    fn get(&self, id: TaskId) -> Option<Task>;
    fn items(&self, filter: &Filter) -> Vec<Task>;
    fn update_done(&self, id: TaskId, done: bool) -> bool;
    fn delete(&self, id: TaskId) -> bool;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub done: Option<bool>,
}

impl Filter {
    pub fn done(done: bool) -> Self {
        Self { done: Some(done) }
    }

    fn matches(&self, task: &Task) -> bool {
        self.done.map_or(true, |done| task.done == done)
    }
}

struct Tasks {
    next_id: TaskId,
    items: HashMap<TaskId, Task>,
}

pub struct HashMapStorage {
    tasks: RwLock<Tasks>,
}

impl HashMapStorage {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Tasks {
                next_id: 1,
                items: HashMap::new(),
            }),
        }
    }
}

impl Default for HashMapStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskDataStore for HashMapStorage {
    fn add(&self, title: String) -> Task {
        let mut tasks = self.tasks.write();
        let task = Task::new(tasks.next_id, title);
        tasks.next_id += 1;
        tasks.items.insert(task.id, task.clone());
        debug!(id = task.id, "task created");
        task
    }

    fn get(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().items.get(&id).cloned()
    }

    fn items(&self, filter: &Filter) -> Vec<Task> {
        let mut list = {
            let tasks = self.tasks.read();
            tasks
                .items
                .values()
                .filter(|task| filter.matches(task))
                .cloned()
                .collect::<Vec<Task>>()
        };
        list.sort_unstable_by_key(|task| task.id);
        list
    }

    fn update_done(&self, id: TaskId, done: bool) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.items.get_mut(&id) {
            Some(task) => {
                task.done = done;
                true
            }
            None => false,
        }
    }

    fn delete(&self, id: TaskId) -> bool {
        self.tasks.write().items.remove(&id).is_some()
    }
}
