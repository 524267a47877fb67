//! Symlinks from a new worktree into its siblings
//!
//! `<container>/share_obj.yaml` maps a sibling directory to the items a new
//! worktree should link rather than own, e.g. build caches or env files:
//!
//! ```yaml
//! main:
//!   - .env
//!   - node_modules
//! ```
//!
//! Problems never fail worktree creation; they come back as warnings.

use serde_yaml::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const SHARE_OBJ_FILENAME: &str = "share_obj.yaml";

/// Create the configured symlinks inside `worktree`. Returns warnings.
pub fn create_shared_symlinks(worktree: &Path, container: &Path) -> Vec<String> {
    let mut warnings = Vec::new();
    let config = container.join(SHARE_OBJ_FILENAME);
    if !config.exists() {
        return warnings;
    }

    let mapping = match fs::read_to_string(&config)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_yaml::from_str::<Value>(&s).map_err(|e| e.to_string()))
    {
        Ok(Value::Mapping(m)) => m,
        Ok(Value::Null) => return warnings,
        Ok(_) => {
            warnings.push(format!("Invalid {}: expected a mapping", SHARE_OBJ_FILENAME));
            return warnings;
        }
        Err(e) => {
            warnings.push(format!("Failed to read {}: {}", SHARE_OBJ_FILENAME, e));
            return warnings;
        }
    };

    // nested names like `feature/login` sit deeper below the container
    let own_name = worktree
        .strip_prefix(container)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned());

    for (key, items) in mapping {
        let Some(source) = key.as_str() else {
            warnings.push(format!("Invalid key in {}: {:?}", SHARE_OBJ_FILENAME, key));
            continue;
        };
        if own_name.as_deref() == Some(source) {
            continue;
        }
        let Some(items) = items.as_sequence() else {
            warnings.push(format!("Invalid format for '{}': expected list", source));
            continue;
        };

        for item in items {
            let Some(item) = item.as_str() else {
                warnings.push(format!("Invalid item under '{}': {:?}", source, item));
                continue;
            };
            if let Some(warning) = link_item(worktree, container, source, item) {
                warnings.push(warning);
            }
        }
    }

    warnings
}

fn link_item(worktree: &Path, container: &Path, source: &str, item: &str) -> Option<String> {
    let item_path = Path::new(item);
    if item_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Some(format!("Skipping non-relative item {}/{}", source, item));
    }

    if let Err(e) = create_link(worktree, container, source, item_path) {
        return Some(format!("Failed to create symlink {}: {}", item, e));
    }

    // linked anyway, the source may appear later
    if !container.join(source).join(item_path).exists() {
        return Some(format!("Source does not exist: {}/{}", source, item));
    }
    None
}

/// Relative link target climbing from the link's directory to `container`
fn link_target(worktree: &Path, container: &Path, source: &str, item: &Path) -> PathBuf {
    let worktree_depth = worktree
        .strip_prefix(container)
        .map(|rel| rel.components().count())
        .unwrap_or(1);
    let item_depth = item.components().count().saturating_sub(1);
    let mut target: PathBuf = std::iter::repeat_n("..", worktree_depth + item_depth).collect();
    target.push(source);
    target.push(item);
    target
}

fn create_link(
    worktree: &Path,
    container: &Path,
    source: &str,
    item: &Path,
) -> std::io::Result<()> {
    let link = worktree.join(item);
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)?;
    }
    symlink(&link_target(worktree, container, source, item), &link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
