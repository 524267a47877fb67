//! wtr - Fast switching between git worktrees
//!
//! This library holds the worktree state engine behind the `wtr` command. It
//! keeps one checkout per branch as siblings inside a *container* directory
//! and answers the questions a picker needs: which worktrees exist, what state
//! each branch is in, which worktrees are stale.
//!
//! # Architecture
//!
//! - **worktree** - the engine: git adapter, layout checks, restructuring,
//!   status, pruning, and the [`WorktreeManager`] facade
//! - **fuzzy** - branch-name scoring and filtering
//! - **config** - `.wtrrc` / `config.toml` loading
//! - **cd_request** - the side channel used to change the shell's directory
//!
//! All git access goes through the external `git` executable.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wtr::{EngineOptions, WorktreeManager};
//!
//! let manager = WorktreeManager::discover(Path::new("."), EngineOptions::default())
//!     .expect("not inside a git repository");
//!
//! for stale in manager.find_stale().expect("git failed") {
//!     println!("{} ({})", stale.branch, stale.reason);
//! }
//! ```

pub mod cd_request;
pub mod config;
pub mod fuzzy;
pub mod worktree;

pub use worktree::*;
