//! Error types for worktree operations
//!
//! This module defines custom error types using thiserror for better
//! error handling and propagation in the worktree module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during worktree operations
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// The git executable is missing or unusable
    #[error("git is not available: {reason}")]
    VcsUnavailable { reason: String },

    /// A git invocation exited with a nonzero status
    #[error("`{command}` failed ({}): {}", exit_label(.exit_code), .stderr.trim())]
    VcsCommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Directory is neither a valid layout nor restructurable
    #[error("Invalid worktree layout at {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    /// Target path of a restructure or create already exists
    #[error("Target already exists: {path}")]
    TargetExists { path: PathBuf },

    /// No rule could determine the main branch
    #[error("{}", AMBIGUOUS_MAIN_BRANCH)]
    AmbiguousMainBranch,

    /// Repository not found or invalid
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    /// Branch has no worktree
    #[error("No worktree for branch: {branch}")]
    NoWorktree { branch: String },

    /// Attempt to remove the main checkout
    #[error("Refusing to remove the main checkout ({branch})")]
    MainCheckout { branch: String },

    /// Commit-ish did not resolve
    #[error("Commit '{spec}' not found")]
    RefNotFound { spec: String },

    /// Another process holds the repository lock
    #[error("Repository is locked by another wtr process ({path})")]
    Locked { path: PathBuf },

    /// Cross-filesystem copy did not match its source
    #[error("Copy verification failed: {reason}")]
    CopyVerificationFailed { reason: String },

    /// Unexpected git output
    #[error("Failed to parse git output: {0}")]
    Parse(String),

    /// Filesystem error with the operation that caused it
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

const AMBIGUOUS_MAIN_BRANCH: &str = "Cannot determine the main branch: no origin default, \
     no 'main' or 'master', and HEAD is detached. Set worktree.default_base in the config.";

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl WorktreeError {
    /// Wrap an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        WorktreeError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias using WorktreeError
pub type Result<T> = std::result::Result<T, WorktreeError>;
