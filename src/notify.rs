//! Comment notifications
//!
//! After a comment is stored, a [`CommentNotifier`] is told about it.
//! Delivery is fire-and-forget: a failing notifier is logged and the comment
//! still counts as created.

use crate::config::NotifyConfig;
use crate::db::{Comment, Database, Process, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to start notifier: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait CommentNotifier: Send + Sync {
    fn notify(&self, process: &Process, comment: &Comment) -> std::result::Result<(), NotifyError>;
}

/// Emits a structured log event per comment
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl CommentNotifier for LogNotifier {
    fn notify(&self, process: &Process, comment: &Comment) -> std::result::Result<(), NotifyError> {
        info!(
            process = %process.slug,
            comment = %comment.id,
            step = comment.step_id.as_deref().unwrap_or("-"),
            "new comment"
        );
        Ok(())
    }
}

/// Runs a shell command per comment with the JSON payload on stdin.
/// The payload is written before `notify` returns; the command's exit is
/// collected on a background thread.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: String,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// JSON handed to the command
    pub fn payload(process: &Process, comment: &Comment) -> serde_json::Value {
        serde_json::json!({
            "process": {
                "slug": process.slug,
                "name": process.name,
            },
            "comment": comment,
        })
    }
}

impl CommentNotifier for CommandNotifier {
    fn notify(&self, process: &Process, comment: &Comment) -> std::result::Result<(), NotifyError> {
        let payload = serde_json::to_vec(&Self::payload(process, comment))?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // stdin closes at the end of this block so the command sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload) {
                warn!(command = %self.command, error = %e, "notifier command did not take the payload");
            }
        }

        let command = self.command.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                warn!(command = %command, %status, "notifier command failed");
            }
            Ok(_) => {}
            Err(e) => warn!(command = %command, error = %e, "notifier command failed"),
        });
        Ok(())
    }
}

/// `CommandNotifier` when a command is configured, `LogNotifier` otherwise
pub fn notifier_from_config(config: &NotifyConfig) -> Box<dyn CommentNotifier> {
    match config.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => Box::new(CommandNotifier::new(command)),
        _ => Box::new(LogNotifier),
    }
}

/// Store a comment and notify about it
pub fn submit_comment(
    db: &Database,
    notifier: &dyn CommentNotifier,
    slug: &str,
    step_id: Option<&str>,
    body: &str,
    author: Option<&str>,
) -> Result<Comment> {
    let process = db.require_process(slug)?;
    let comment = db.add_comment(&process, step_id, body, author)?;

    if let Err(e) = notifier.notify(&process, &comment) {
        warn!(process = %slug, comment = %comment.id, error = %e, "comment notification failed");
    }
    Ok(comment)
}
