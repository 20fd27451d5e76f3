//! Command-name validation and output-file lookup.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static COMMAND_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("regex for command names"));

/// Validate that a command name is a bare alphanumeric token.
///
/// Command names become file names inside the stub directory, so anything
/// that could introduce a separator or a dot segment is rejected.
pub(crate) fn validate_command_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("command name is empty"));
    }
    if !COMMAND_NAME.is_match(name) {
        return Err(anyhow!("command name must match [A-Za-z0-9]+"));
    }
    Ok(())
}

/// Ordered list of directories consulted when resolving `output_file` values.
///
/// Directories are kept in the order configs were loaded; the first directory
/// containing the requested file wins.
#[derive(Debug, Clone, Default)]
pub struct SearchDirs {
    dirs: Vec<PathBuf>,
}

impl SearchDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the containing directory of a config file.
    ///
    /// The directory is canonicalized so lookups do not depend on the working
    /// directory at enable time.
    pub fn push_config_file(&mut self, config: &Path) -> Result<()> {
        let parent = match config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.push_dir(&parent)
    }

    pub fn push_dir(&mut self, dir: &Path) -> Result<()> {
        let canonical = fs::canonicalize(dir)
            .with_context(|| format!("resolve search dir {}", dir.display()))?;
        if !self.dirs.contains(&canonical) {
            self.dirs.push(canonical);
        }
        Ok(())
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Find the first existing file named `file`.
    ///
    /// Absolute paths are returned as-is when they point at a file.
    pub fn resolve(&self, file: &Path) -> Option<PathBuf> {
        if file.is_absolute() {
            return file.is_file().then(|| file.to_path_buf());
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_names() {
        assert!(validate_command_name("ls").is_ok());
        assert!(validate_command_name("python3").is_ok());
        assert!(validate_command_name("GIT").is_ok());
    }

    #[test]
    fn rejects_names_with_separators() {
        assert!(validate_command_name("").is_err());
        assert!(validate_command_name("../ls").is_err());
        assert!(validate_command_name("git-lfs").is_err());
        assert!(validate_command_name("a b").is_err());
    }

    #[test]
    fn resolves_in_load_order() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        fs::write(second.path().join("out.txt"), "second").expect("write");
        fs::write(first.path().join("only.txt"), "first").expect("write");

        let mut dirs = SearchDirs::new();
        dirs.push_dir(first.path()).expect("push first");
        dirs.push_dir(second.path()).expect("push second");

        let found = dirs.resolve(Path::new("out.txt")).expect("found");
        assert_eq!(fs::read_to_string(found).expect("read"), "second");
        let found = dirs.resolve(Path::new("only.txt")).expect("found");
        assert_eq!(fs::read_to_string(found).expect("read"), "first");
        assert!(dirs.resolve(Path::new("missing.txt")).is_none());
    }

    #[test]
    fn earlier_directory_shadows_later_one() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        fs::write(first.path().join("out.txt"), "first").expect("write");
        fs::write(second.path().join("out.txt"), "second").expect("write");

        let mut dirs = SearchDirs::new();
        dirs.push_config_file(&first.path().join("fakes.yml"))
            .expect("push first");
        dirs.push_config_file(&second.path().join("fakes.yml"))
            .expect("push second");

        let found = dirs.resolve(Path::new("out.txt")).expect("found");
        assert_eq!(fs::read_to_string(found).expect("read"), "first");
    }

    #[test]
    fn absolute_paths_bypass_search_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("abs.txt");
        fs::write(&file, "abs").expect("write");
        let dirs = SearchDirs::new();
        assert_eq!(dirs.resolve(&file), Some(file));
    }
}
