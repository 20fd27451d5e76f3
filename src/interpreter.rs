//! Discovery of the real programs stub scripts rely on.
//!
//! Lookups must run before the stub directory is put on the search path,
//! otherwise a faked `bash` or `cat` could be picked up instead of the real
//! one. Stubs reference both by absolute path.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Shells tried in order when scanning the search path.
const SHELLS: &[&str] = &["bash", "sh"];
/// Used when no shell is found on the search path.
pub const FALLBACK_SHELL: &str = "/bin/sh";
/// Used when `cat` is not found on the search path.
pub const FALLBACK_CAT: &str = "/bin/cat";

/// Absolute paths of the programs a stub executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Named in the shebang line.
    pub shell: PathBuf,
    /// Emits copied output files.
    pub cat: PathBuf,
}

impl Interpreter {
    /// Resolve against an explicit search-path value.
    pub fn discover_in(path_var: Option<&OsStr>) -> Self {
        let shell = path_var
            .and_then(|path_var| {
                SHELLS
                    .iter()
                    .find_map(|name| find_in_path(path_var, name))
            })
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL));
        let cat = path_var
            .and_then(|path_var| find_in_path(path_var, "cat"))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_CAT));
        Self { shell, cat }
    }
}

fn find_in_path(path_var: &OsStr, name: &str) -> Option<PathBuf> {
    env::split_paths(path_var)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
