//! Turns store outcomes into user-facing notices.
//!
//! The store only returns values; this layer decides what the user sees.
//! Validation failures are not turned into notices because the caller shows
//! them next to the input that caused them.

use std::io::{self, IsTerminal, Write};

use tracing::debug;

use crate::error::{StoreError, StoreOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(description: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Success".to_string(),
            description: description.to_string(),
        }
    }

    pub fn error(description: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            description: description.to_string(),
        }
    }
}

pub fn notice_for<T>(op: StoreOp, outcome: &Result<T, StoreError>) -> Option<Notice> {
    match outcome {
        Ok(_) => match op {
            StoreOp::Load => None,
            StoreOp::Create => Some(Notice::success("Task created successfully!")),
            StoreOp::Update => Some(Notice::success("Task updated successfully!")),
            StoreOp::Delete => Some(Notice::success("Task deleted successfully!")),
        },
        Err(err) if err.is_validation() => None,
        Err(_) => Some(Notice::error(match op {
            StoreOp::Load => "Failed to fetch tasks. Please make sure you're authenticated.",
            StoreOp::Create => "Failed to create task.",
            StoreOp::Update => "Failed to update task.",
            StoreOp::Delete => "Failed to delete task.",
        })),
    }
}

pub trait NoticeSink {
    fn show(&mut self, notice: &Notice);
}

/// Emits the notice (if any) for `outcome` and passes the outcome through.
pub fn report<T, K: NoticeSink + ?Sized>(
    sink: &mut K,
    op: StoreOp,
    outcome: Result<T, StoreError>,
) -> Result<T, StoreError> {
    if let Some(notice) = notice_for(op, &outcome) {
        debug!(op = %op, level = ?notice.level, "presenting notice");
        sink.show(&notice);
    }
    outcome
}

/// Writes notices to stderr, colored when stderr is a terminal.
#[derive(Debug, Clone)]
pub struct TerminalSink {
    color: bool,
}

impl TerminalSink {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stderr().is_terminal(),
        }
    }
}

impl TerminalSink {
    fn write_notice<W: Write>(&self, out: &mut W, notice: &Notice) -> io::Result<()> {
        let code = match notice.level {
            NoticeLevel::Success => "32",
            NoticeLevel::Error => "31",
        };
        let title = if self.color {
            format!("\x1b[{code}m{}\x1b[0m", notice.title)
        } else {
            notice.title.clone()
        };
        writeln!(out, "{title}: {}", notice.description)
    }
}

impl NoticeSink for TerminalSink {
    fn show(&mut self, notice: &Notice) {
        let mut err = io::stderr().lock();
        if let Err(error) = self.write_notice(&mut err, notice) {
            debug!(%error, "failed to write notice to stderr");
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl NoticeSink for SilentSink {
    fn show(&mut self, _notice: &Notice) {}
}

/// Keeps every notice it is shown.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub notices: Vec<Notice>,
}

impl NoticeSink for CollectingSink {
    fn show(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use std::io::{self, Write};

    use super::{CollectingSink, Notice, NoticeLevel, NoticeSink, TerminalSink, notice_for, report};
    use crate::error::{StoreError, StoreOp};

    #[test]
    fn successful_load_is_quiet() {
        let outcome: Result<(), StoreError> = Ok(());
        assert!(notice_for(StoreOp::Load, &outcome).is_none());
    }

    #[test]
    fn failed_load_mentions_authentication() {
        let outcome: Result<(), StoreError> = Err(StoreError::Fetch(anyhow!("401")));
        let notice = notice_for(StoreOp::Load, &outcome).expect("notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.description.contains("authenticated"));
    }

    #[test]
    fn validation_errors_are_left_to_the_form() {
        let outcome: Result<(), StoreError> = Err(StoreError::validation("title is required"));
        assert!(notice_for(StoreOp::Create, &outcome).is_none());
    }

    #[test]
    fn report_passes_outcome_through_and_records_notice() {
        let mut sink = CollectingSink::default();

        let created = report(&mut sink, StoreOp::Create, Ok::<_, StoreError>(7));
        assert_eq!(created.expect("ok"), 7);

        let failed = report(
            &mut sink,
            StoreOp::Delete,
            Err::<(), _>(StoreError::NotAuthenticated),
        );
        assert!(failed.is_err());

        assert_eq!(
            sink.notices,
            vec![
                Notice::success("Task created successfully!"),
                Notice::error("Failed to delete task."),
            ]
        );
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn terminal_sink_surfaces_write_failures() {
        let sink = TerminalSink { color: false };
        let notice = Notice::success("Task created successfully!");

        let mut buf = Vec::new();
        sink.write_notice(&mut buf, &notice).expect("write");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "Success: Task created successfully!\n"
        );

        let err = sink
            .write_notice(&mut ClosedPipe, &notice)
            .expect_err("closed pipe");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut sink = sink;
        sink.show(&notice);
    }
}
