//! Directory-change side channel
//!
//! A child process cannot change its parent shell's directory, so wtr writes
//! the target path to a file and the shell wrapper from `wtr shell-init` reads
//! it, `cd`s, and deletes it. The wrapper supplies a unique path per call via
//! [`CD_FILE_ENV_VAR`].
//!
//! Without a wrapper, requests go to a per-user, per-shell file in the temp
//! directory. Nobody deletes those, so each write sweeps the user's fallback
//! files that are older than a day.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Environment variable naming the side-channel file
pub const CD_FILE_ENV_VAR: &str = "WTR_CD_FILE";

const FALLBACK_PREFIX: &str = ".wtr_cd_";

/// Age after which an unread fallback request is removed
const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the directory-change request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdFile {
    /// Given by `--cd-file` or the wrapper's environment; the caller cleans up
    Requested(PathBuf),
    /// Per-user, per-parent-process file in the temp directory
    Fallback(PathBuf),
}

impl CdFile {
    pub fn path(&self) -> &Path {
        match self {
            CdFile::Requested(path) | CdFile::Fallback(path) => path,
        }
    }
}

/// Side-channel path: explicit flag, then environment, then the fallback.
pub fn cd_file_path(explicit: Option<&Path>) -> CdFile {
    resolve_cd_file(explicit, std::env::var_os(CD_FILE_ENV_VAR).map(PathBuf::from))
}

fn resolve_cd_file(explicit: Option<&Path>, from_env: Option<PathBuf>) -> CdFile {
    if let Some(path) = explicit {
        return CdFile::Requested(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return CdFile::Requested(path);
    }
    let name = fallback_file_name(&current_user(), parent_pid());
    CdFile::Fallback(std::env::temp_dir().join(name))
}

fn fallback_file_name(user: &str, ppid: u32) -> String {
    format!("{}{}_{}", FALLBACK_PREFIX, user, ppid)
}

fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            dirs::home_dir().and_then(|h| h.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(unix)]
fn parent_pid() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn parent_pid() -> u32 {
    std::process::id()
}

/// Write `target` to the side-channel file, replacing any previous request.
pub fn write_cd_request(cd_file: &CdFile, target: &Path) -> io::Result<()> {
    let path = cd_file.path();
    log::debug!("cd request {} -> {}", path.display(), target.display());
    if let CdFile::Fallback(path) = cd_file {
        sweep_stale_requests(path, SystemTime::now());
    }
    fs::write(path, target.to_string_lossy().as_bytes())
}

/// Remove the same user's fallback files, other than `current`, last
/// written more than [`STALE_AFTER`] before `now`. Failures are logged.
fn sweep_stale_requests(current: &Path, now: SystemTime) {
    let (Some(dir), Some(name)) = (current.parent(), current.file_name()) else {
        return;
    };
    let name = name.to_string_lossy();
    // `.wtr_cd_<user>_` without the pid
    let Some((user_prefix, _)) = name.rsplit_once('_') else {
        return;
    };
    let user_prefix = format!("{}_", user_prefix);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("cannot scan {} for old cd requests: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_ours = entry.file_name().to_string_lossy().starts_with(&user_prefix);
        if !is_ours || path == current {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > STALE_AFTER);
        if stale {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("removed old cd request {}", path.display()),
                Err(e) => log::debug!("cannot remove {}: {}", path.display(), e),
            }
        }
    }
}
