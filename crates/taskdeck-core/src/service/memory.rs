use anyhow::anyhow;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{TaskService, materialize, sort_newest_first};
use crate::task::{NewTask, Principal, Task, TaskPatch};

#[derive(Debug, Default)]
struct Inner {
    principal: Option<Principal>,
    rows: Vec<Task>,
    fail_next: Option<String>,
}

/// In-process task service.
///
/// `fail_next` arms a one-shot transport error for the next call, which is how
/// tests exercise the store's failure paths.
#[derive(Debug, Default)]
pub struct MemoryService {
    inner: Mutex<Inner>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(id: &str) -> Self {
        let service = Self::new();
        service.set_principal(Some(Principal { id: id.to_string() }));
        service
    }

    pub fn set_principal(&self, principal: Option<Principal>) {
        self.inner.lock().principal = principal;
    }

    pub fn fail_next(&self, message: &str) {
        self.inner.lock().fail_next = Some(message.to_string());
    }

    /// Inserts a fully formed row, bypassing defaults. Useful for seeding.
    pub fn seed(&self, task: Task) {
        self.inner.lock().rows.push(task);
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().rows.len()
    }

    fn take_failure(inner: &mut Inner) -> anyhow::Result<()> {
        match inner.fail_next.take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

impl TaskService for MemoryService {
    fn current_principal(&self) -> anyhow::Result<Option<Principal>> {
        let mut inner = self.inner.lock();
        Self::take_failure(&mut inner)?;
        Ok(inner.principal.clone())
    }

    fn fetch_tasks(&self, principal: &Principal) -> anyhow::Result<Vec<Task>> {
        let mut inner = self.inner.lock();
        Self::take_failure(&mut inner)?;
        let mut owned: Vec<Task> = inner
            .rows
            .iter()
            .filter(|task| task.owner == principal.id)
            .cloned()
            .collect();
        sort_newest_first(&mut owned);
        Ok(owned)
    }

    fn insert(&self, principal: &Principal, new_task: NewTask) -> anyhow::Result<Task> {
        let mut inner = self.inner.lock();
        Self::take_failure(&mut inner)?;
        if new_task.title.trim().is_empty() {
            return Err(anyhow!("title violates not-null constraint"));
        }
        let task = materialize(principal, new_task, Utc::now());
        inner.rows.push(task.clone());
        Ok(task)
    }

    fn update(&self, id: Uuid, patch: &TaskPatch) -> anyhow::Result<Task> {
        let mut inner = self.inner.lock();
        Self::take_failure(&mut inner)?;
        let owner = inner
            .principal
            .as_ref()
            .map(|principal| principal.id.clone())
            .ok_or_else(|| anyhow!("no signed-in user"))?;
        let row = inner
            .rows
            .iter_mut()
            .find(|task| task.id == id && task.owner == owner)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        if patch.apply_to(row) {
            row.updated_at = Utc::now();
        }
        Ok(row.clone())
    }

    fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        Self::take_failure(&mut inner)?;
        let owner = inner
            .principal
            .as_ref()
            .map(|principal| principal.id.clone())
            .ok_or_else(|| anyhow!("no signed-in user"))?;

        let idx = inner
            .rows
            .iter()
            .position(|task| task.id == id && task.owner == owner)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        inner.rows.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryService;
    use crate::service::TaskService;
    use crate::task::{NewTask, Principal};

    #[test]
    fn failure_injection_is_one_shot() {
        let service = MemoryService::signed_in("ana");
        service.fail_next("connection reset");

        let err = service.current_principal().expect_err("armed failure");
        assert_eq!(err.to_string(), "connection reset");
        assert!(service.current_principal().expect("second call").is_some());
    }

    #[test]
    fn insert_requires_title() {
        let service = MemoryService::signed_in("ana");
        let principal = Principal {
            id: "ana".to_string(),
        };
        assert!(service.insert(&principal, NewTask::titled(" ")).is_err());
        assert_eq!(service.row_count(), 0);
    }
}
