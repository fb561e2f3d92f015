use std::fmt;

use thiserror::Error;

/// Store operation that produced an outcome. Used for log fields and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Load,
    Create,
    Update,
    Delete,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::Load => "load",
            StoreOp::Create => "create",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to fetch tasks")]
    Fetch(#[source] anyhow::Error),

    #[error("failed to {op} task")]
    Write {
        op: StoreOp,
        #[source]
        source: anyhow::Error,
    },

    #[error("not authenticated")]
    NotAuthenticated,
}

impl StoreError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn write(op: StoreOp, source: anyhow::Error) -> Self {
        Self::Write { op, source }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Fetch(_) => "fetch_error",
            Self::Write { .. } => "write_error",
            Self::NotAuthenticated => "not_authenticated",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{StoreError, StoreOp};

    #[test]
    fn codes_are_stable() {
        assert_eq!(StoreError::validation("title is required").code(), "validation_error");
        assert_eq!(StoreError::Fetch(anyhow!("offline")).code(), "fetch_error");
        assert_eq!(
            StoreError::write(StoreOp::Delete, anyhow!("gone")).code(),
            "write_error"
        );
        assert_eq!(StoreError::NotAuthenticated.code(), "not_authenticated");
    }

    #[test]
    fn write_error_names_the_operation() {
        let err = StoreError::write(StoreOp::Update, anyhow!("row not visible"));
        assert_eq!(err.to_string(), "failed to update task");
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "failed to update task: row not visible"
        );
    }

    #[test]
    fn alternate_display_names_the_cause_once() {
        let err = StoreError::write(StoreOp::Delete, anyhow!("task not found"));
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "failed to delete task: task not found"
        );

        let err = StoreError::Fetch(anyhow!("no signed-in user"));
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "failed to fetch tasks: no signed-in user"
        );
    }
}
