//! Resolution of store paths against the process-wide project root.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// Environment variable that overrides the project root.
pub const ROOT_ENV: &str = "PROJECT_ROOT";

/// The directory relative store paths are resolved against.
///
/// `PROJECT_ROOT` wins when set and non-empty, then the current working
/// directory, then the directory holding the running executable.
pub fn project_root() -> StoreResult<PathBuf> {
    root_from(std::env::var_os(ROOT_ENV))
}

fn root_from(env: Option<OsString>) -> StoreResult<PathBuf> {
    if let Some(root) = env.filter(|r| !r.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    match std::env::current_dir() {
        Ok(cwd) => Ok(cwd),
        Err(cwd_err) => {
            let exe = std::env::current_exe().map_err(|_| cwd_err)?;
            exe.parent().map(Path::to_path_buf).ok_or_else(|| {
                StoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "unable to determine project root",
                ))
            })
        }
    }
}

/// Join `path` onto `root` unless it is already absolute.
pub fn resolve_in(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Resolve `path` against [`project_root`].
pub fn resolve(path: &Path) -> StoreResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(resolve_in(&project_root()?, path))
}
