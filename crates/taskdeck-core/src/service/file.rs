use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use super::{TaskService, materialize, normalize_handle, sort_newest_first};
use crate::task::{NewTask, Principal, Task, TaskPatch};

const TASKS_FILE: &str = "tasks.jsonl";
const SESSION_FILE: &str = "session.json";

/// Local stand-in for the hosted task service.
///
/// Rows for every user live in one JSON-lines table; each call only sees the
/// rows owned by the signed-in principal.
#[derive(Debug)]
pub struct FileService {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub session_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    principal: Principal,
    signed_in_at: chrono::DateTime<Utc>,
}

impl FileService {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(TASKS_FILE);
        let session_path = data_dir.join(SESSION_FILE);

        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            session = %session_path.display(),
            "opened file service"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            session_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn sign_in(&self, handle: &str) -> anyhow::Result<Principal> {
        let id = normalize_handle(handle)
            .ok_or_else(|| anyhow!("handle must be a single non-empty word"))?;
        let session = Session {
            principal: Principal { id },
            signed_in_at: Utc::now(),
        };
        let serialized = serde_json::to_string_pretty(&session)?;
        write_atomic(&self.session_path, serialized.as_bytes())
            .context("failed to save session")?;
        info!(principal = %session.principal.id, "signed in");
        Ok(session.principal)
    }

    /// Returns the principal that was signed in, if any.
    #[tracing::instrument(skip(self))]
    pub fn sign_out(&self) -> anyhow::Result<Option<Principal>> {
        let previous = self.current_principal()?;
        if self.session_path.exists() {
            fs::remove_file(&self.session_path)
                .with_context(|| format!("failed removing {}", self.session_path.display()))?;
        }
        Ok(previous)
    }

    fn require_principal(&self) -> anyhow::Result<Principal> {
        self.current_principal()?
            .ok_or_else(|| anyhow!("no signed-in user"))
    }

    fn load_rows(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path)
            .with_context(|| format!("failed to load {}", self.tasks_path.display()))
    }

    fn save_rows(&self, rows: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, rows)
            .with_context(|| format!("failed to save {}", self.tasks_path.display()))
    }
}

impl TaskService for FileService {
    fn current_principal(&self) -> anyhow::Result<Option<Principal>> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.session_path)
            .with_context(|| format!("failed reading {}", self.session_path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let session: Session = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.session_path.display()))?;
        Ok(Some(session.principal))
    }

    #[tracing::instrument(skip(self), fields(principal = %principal.id))]
    fn fetch_tasks(&self, principal: &Principal) -> anyhow::Result<Vec<Task>> {
        let mut owned: Vec<Task> = self
            .load_rows()?
            .into_iter()
            .filter(|task| task.owner == principal.id)
            .collect();
        sort_newest_first(&mut owned);
        debug!(count = owned.len(), "fetched owned rows");
        Ok(owned)
    }

    #[tracing::instrument(skip(self, new_task), fields(principal = %principal.id))]
    fn insert(&self, principal: &Principal, new_task: NewTask) -> anyhow::Result<Task> {
        if new_task.title.trim().is_empty() {
            return Err(anyhow!("title violates not-null constraint"));
        }

        let mut rows = self.load_rows()?;
        let task = materialize(principal, new_task, Utc::now());
        rows.push(task.clone());
        self.save_rows(&rows)?;

        debug!(id = %task.id, rows = rows.len(), "inserted row");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch), fields(id = %id))]
    fn update(&self, id: Uuid, patch: &TaskPatch) -> anyhow::Result<Task> {
        let principal = self.require_principal()?;
        let mut rows = self.load_rows()?;

        let row = rows
            .iter_mut()
            .find(|task| task.id == id && task.owner == principal.id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;

        if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(anyhow!("title violates not-null constraint"));
        }

        let changed = patch.apply_to(row);
        let updated = if changed {
            row.updated_at = Utc::now();
            let updated = row.clone();
            self.save_rows(&rows)?;
            updated
        } else {
            row.clone()
        };

        debug!(changed, "updated row");
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let principal = self.require_principal()?;
        let mut rows = self.load_rows()?;

        let idx = rows
            .iter()
            .position(|task| task.id == id && task.owner == principal.id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        rows.remove(idx);
        self.save_rows(&rows)?;

        debug!(rows = rows.len(), "deleted row");
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let mut buf = Vec::new();
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(buf, "{serialized}")?;
    }
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
