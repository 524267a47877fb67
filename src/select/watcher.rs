//! File system watcher with gitignore filtering
//!
//! Any relevant change in a worktree invalidates the picker's status cache.
//! The event loop debounces the signals.

use ignore::gitignore::Gitignore;
use notify::event::ModifyKind;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Watch every worktree directory; one `()` is sent per relevant event.
pub fn setup_watcher<'a>(
    worktrees: impl IntoIterator<Item = &'a Path>,
    tx: mpsc::Sender<()>,
) -> io::Result<RecommendedWatcher> {
    let roots: Vec<PathBuf> = worktrees.into_iter().map(Path::to_path_buf).collect();
    let ignores: Vec<(PathBuf, Gitignore)> = roots
        .iter()
        .map(|root| {
            let (gi, err) = Gitignore::new(root.join(".gitignore"));
            if let Some(e) = err {
                log::debug!("partial .gitignore in {}: {}", root.display(), e);
            }
            (root.clone(), gi)
        })
        .collect();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if should_process_event(&event, &ignores) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => log::debug!("watch error: {}", e),
        },
        Config::default(),
    )
    .map_err(io::Error::other)?;

    for root in &roots {
        if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
            log::warn!("cannot watch {}: {}", root.display(), e);
        }
    }
    log::debug!("watching {} worktrees", roots.len());

    Ok(watcher)
}

/// Whether a file system event can change branch status
fn should_process_event(event: &notify::Event, ignores: &[(PathBuf, Gitignore)]) -> bool {
    let is_relevant = event.paths.iter().any(|path| {
        let path_str = path.to_string_lossy();

        if path_str.ends_with(".tmp")
            || path_str.ends_with(".swp")
            || path_str.ends_with('~')
            || path_str.contains(".tmp.")
        {
            return false;
        }

        if path_str.contains("/.git/") || path_str.ends_with("/.git") {
            return path_str.contains("/.git/index")
                || path_str.contains("/.git/HEAD")
                || path_str.contains("/.git/refs/")
                || path_str.contains("/.git/worktrees/")
                || path_str.contains("/.git/MERGE_HEAD")
                || path_str.contains("/.git/rebase-")
                || path_str.contains("/.git/logs/refs/stash");
        }

        match ignores.iter().find(|(root, _)| path.starts_with(root)) {
            Some((root, gitignore)) => {
                let relative = path.strip_prefix(root).unwrap_or(path);
                !gitignore
                    .matched_path_or_any_parents(relative, path.is_dir())
                    .is_ignore()
            }
            None => true,
        }
    });

    is_relevant
        && matches!(
            event.kind,
            EventKind::Modify(ModifyKind::Data(_))
                | EventKind::Modify(ModifyKind::Name(_))
                | EventKind::Create(_)
                | EventKind::Remove(_)
        )
}
