//! Local copy of the signed-in user's tasks.
//!
//! Every write goes to the [`TaskService`] first; the local collection only
//! changes once the service has answered. A failed call leaves the collection
//! exactly as it was and hands the error back to the caller. Presenting the
//! outcome is left to [`crate::notice`].

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreOp};
use crate::service::TaskService;
use crate::task::{NewTask, Task, TaskPatch};

#[derive(Debug)]
pub struct TaskStore<S> {
    service: S,
    tasks: Vec<Task>,
    loaded: bool,
}

impl<S: TaskService> TaskStore<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            tasks: Vec::new(),
            loaded: false,
        }
    }

    /// Tasks in store order: most recently created first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[instrument(skip(self))]
    pub fn load(&mut self) -> Result<&[Task], StoreError> {
        let fetched = self
            .service
            .current_principal()
            .and_then(|principal| {
                let principal =
                    principal.ok_or_else(|| anyhow::anyhow!("no signed-in user"))?;
                self.service.fetch_tasks(&principal)
            });

        match fetched {
            Ok(tasks) => {
                info!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                self.loaded = true;
                Ok(&self.tasks)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), kept = self.tasks.len(), "error fetching tasks");
                Err(StoreError::Fetch(err))
            }
        }
    }

    #[instrument(skip(self, new_task), fields(title_len = new_task.title.len()))]
    pub fn create(&mut self, mut new_task: NewTask) -> Result<Task, StoreError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            debug!("rejected create with blank title");
            return Err(StoreError::validation("title is required"));
        }
        new_task.title = title.to_string();

        let principal = match self.service.current_principal() {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                warn!("error creating task: not authenticated");
                return Err(StoreError::NotAuthenticated);
            }
            Err(err) => return Err(self.write_failed(StoreOp::Create, err)),
        };

        match self.service.insert(&principal, new_task) {
            Ok(task) => {
                info!(id = %task.id, "created task");
                self.tasks.insert(0, task.clone());
                Ok(task)
            }
            Err(err) => Err(self.write_failed(StoreOp::Create, err)),
        }
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    pub fn update(&mut self, id: Uuid, patch: TaskPatch) -> Result<Task, StoreError> {
        if patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            debug!("rejected update with blank title");
            return Err(StoreError::validation("title is required"));
        }

        match self.service.update(id, &patch) {
            Ok(task) => {
                info!(id = %task.id, "updated task");
                for local in self.tasks.iter_mut().filter(|local| local.id == id) {
                    *local = task.clone();
                }
                Ok(task)
            }
            Err(err) => Err(self.write_failed(StoreOp::Update, err)),
        }
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        match self.service.delete(id) {
            Ok(()) => {
                self.tasks.retain(|task| task.id != id);
                info!(remaining = self.tasks.len(), "deleted task");
                Ok(())
            }
            Err(err) => Err(self.write_failed(StoreOp::Delete, err)),
        }
    }

    /// Flips `completed` on a locally known task. Unknown ids are ignored and
    /// yield `Ok(None)` without contacting the service.
    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let Some(current) = self.get(id).map(|task| task.completed) else {
            debug!("toggle ignored for unknown task");
            return Ok(None);
        };
        self.update(id, TaskPatch::completed(!current)).map(Some)
    }

    fn write_failed(&self, op: StoreOp, err: anyhow::Error) -> StoreError {
        warn!(op = %op, error = %format!("{err:#}"), "error writing task");
        StoreError::write(op, err)
    }
}
