//! Search-path management over an injectable environment.
//!
//! Stubs shadow real programs by sitting at the front of `PATH`. The
//! environment is reached through [`PathEnv`] so tests can use
//! [`MemoryEnv`] instead of mutating the process.

use anyhow::{Context, Result};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the search-path variable.
pub const PATH_VAR: &str = "PATH";

/// Read and write access to the search-path variable.
pub trait PathEnv {
    fn get(&self) -> Option<OsString>;
    fn set(&mut self, value: &OsStr);
    fn unset(&mut self);
}

/// The real process environment.
///
/// Mutating it affects the whole process; only one enabled session should
/// use it at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl PathEnv for ProcessEnv {
    fn get(&self) -> Option<OsString> {
        env::var_os(PATH_VAR)
    }

    fn set(&mut self, value: &OsStr) {
        env::set_var(PATH_VAR, value);
    }

    fn unset(&mut self) {
        env::remove_var(PATH_VAR);
    }
}

/// An in-memory stand-in for the process environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnv {
    value: Option<OsString>,
}

impl MemoryEnv {
    pub fn new(value: Option<&str>) -> Self {
        Self {
            value: value.map(OsString::from),
        }
    }

    pub fn value(&self) -> Option<&OsStr> {
        self.value.as_deref()
    }
}

impl PathEnv for MemoryEnv {
    fn get(&self) -> Option<OsString> {
        self.value.clone()
    }

    fn set(&mut self, value: &OsStr) {
        self.value = Some(value.to_os_string());
    }

    fn unset(&mut self) {
        self.value = None;
    }
}

/// Put `dir` at the front of the search path unless an entry already equals it.
///
/// A set but empty variable holds one empty entry, so it becomes `dir:` and
/// [`deactivate`] gives back `""` rather than unsetting it.
pub fn activate<E: PathEnv + ?Sized>(env: &mut E, dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = match env.get() {
        Some(current) => env::split_paths(&current).collect(),
        None => Vec::new(),
    };
    if entries.iter().any(|entry| same_entry(entry, dir)) {
        return Ok(());
    }
    entries.insert(0, dir.to_path_buf());
    let joined = env::join_paths(&entries)
        .with_context(|| format!("add {} to {PATH_VAR}", dir.display()))?;
    env.set(&joined);
    debug!(dir = %dir.display(), "prepended stub dir to search path");
    Ok(())
}

/// Drop every search-path entry containing `dir`.
///
/// The variable is removed when no entries remain; an absent entry is a no-op.
pub fn deactivate<E: PathEnv + ?Sized>(env: &mut E, dir: &Path) -> Result<()> {
    let Some(current) = env.get() else {
        return Ok(());
    };
    let needle = dir.to_string_lossy();
    let entries: Vec<PathBuf> = env::split_paths(&current).collect();
    let kept: Vec<&PathBuf> = entries
        .iter()
        .filter(|entry| !entry.to_string_lossy().contains(needle.as_ref()))
        .collect();
    if kept.len() == entries.len() {
        return Ok(());
    }
    if kept.is_empty() {
        env.unset();
    } else {
        let joined = env::join_paths(kept)
            .with_context(|| format!("remove {} from {PATH_VAR}", dir.display()))?;
        env.set(&joined);
    }
    debug!(dir = %dir.display(), "removed stub dir from search path");
    Ok(())
}

fn same_entry(entry: &Path, dir: &Path) -> bool {
    entry.components().eq(dir.components())
}
