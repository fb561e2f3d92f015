//! Contract for the backend that owns persistence and sign-in.
//!
//! The store never touches storage directly; it talks to a [`TaskService`].
//! Two implementations ship with the crate: [`FileService`] keeps a per-user
//! table in a data directory and emulates the hosted service locally, and
//! [`MemoryService`] keeps everything in process for tests and embedding.

mod file;
mod memory;

pub use file::FileService;
pub use memory::MemoryService;
use uuid::Uuid;

use crate::task::{NewTask, Principal, Task, TaskPatch};

pub trait TaskService {
    /// Signed-in identity, or `None` when nobody is signed in.
    fn current_principal(&self) -> anyhow::Result<Option<Principal>>;

    /// All rows owned by `principal`, newest `created_at` first.
    fn fetch_tasks(&self, principal: &Principal) -> anyhow::Result<Vec<Task>>;

    fn insert(&self, principal: &Principal, new_task: NewTask) -> anyhow::Result<Task>;

    fn update(&self, id: Uuid, patch: &TaskPatch) -> anyhow::Result<Task>;

    fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

impl<S: TaskService + ?Sized> TaskService for &S {
    fn current_principal(&self) -> anyhow::Result<Option<Principal>> {
        (**self).current_principal()
    }

    fn fetch_tasks(&self, principal: &Principal) -> anyhow::Result<Vec<Task>> {
        (**self).fetch_tasks(principal)
    }

    fn insert(&self, principal: &Principal, new_task: NewTask) -> anyhow::Result<Task> {
        (**self).insert(principal, new_task)
    }

    fn update(&self, id: Uuid, patch: &TaskPatch) -> anyhow::Result<Task> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        (**self).delete(id)
    }
}

pub(crate) fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().to_lowercase();
    if handle.is_empty() || handle.chars().any(char::is_whitespace) {
        None
    } else {
        Some(handle)
    }
}

pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Builds the persisted row for a create request.
pub(crate) fn materialize(
    principal: &Principal,
    new_task: NewTask,
    now: chrono::DateTime<chrono::Utc>,
) -> Task {
    Task {
        id: Uuid::new_v4(),
        title: new_task.title.trim().to_string(),
        description: new_task.description,
        completed: false,
        priority: new_task.priority.unwrap_or_default(),
        due_date: new_task.due_date,
        category: new_task.category,
        created_at: now,
        updated_at: now,
        owner: principal.id.clone(),
    }
}
