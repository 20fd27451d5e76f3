//! Stub directory lifecycle and artifact materialization.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::hashing::sha256_file;
use crate::synth::{FileCopy, StubPlan};

/// Mode applied to every stub script.
pub const STUB_MODE: u32 = 0o755;

/// The directory holding generated stubs and their copied output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubDir {
    root: PathBuf,
}

/// A file found in the stub directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the stub directory.
    pub path: PathBuf,
    pub executable: bool,
}

impl StubDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create stub dir {}", self.root.display()))
    }

    /// Remove the directory and everything in it. A missing directory is
    /// not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                debug!(dir = %self.root.display(), "removed stub dir");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove stub dir {}", self.root.display()))
            }
        }
    }

    /// Write one planned stub: output files first, then the script.
    pub fn write(&self, plan: &StubPlan) -> Result<()> {
        if plan.needs_files_dir {
            fs::create_dir_all(&plan.layout.files_dir).with_context(|| {
                format!("create files dir {}", plan.layout.files_dir.display())
            })?;
        }
        for copy in &plan.copies {
            copy_verified(copy)?;
        }
        write_script(&self.root, &plan.layout.script, &plan.script)?;
        debug!(
            command = %plan.command,
            path = %plan.layout.script.display(),
            copies = plan.copies.len(),
            "wrote stub"
        );
        Ok(())
    }

    /// List every file under the stub directory, sorted by path.
    pub fn inventory(&self) -> Result<Vec<Artifact>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut artifacts = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let mode = entry
                .metadata()
                .with_context(|| format!("stat {}", entry.path().display()))?
                .permissions()
                .mode();
            artifacts.push(Artifact {
                path: entry.path().strip_prefix(&self.root)?.to_path_buf(),
                executable: mode & 0o111 != 0,
            });
        }
        Ok(artifacts)
    }
}

/// Write a script so its final path never holds partial content.
fn write_script(dir: &Path, path: &Path, contents: &str) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp stub in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("write stub {}", path.display()))?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(STUB_MODE))
        .with_context(|| format!("set permissions {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("persist stub {}", path.display()))?;
    Ok(())
}

fn copy_verified(copy: &FileCopy) -> Result<()> {
    fs::copy(&copy.source, &copy.dest).with_context(|| {
        format!(
            "copy output file {} to {}",
            copy.source.display(),
            copy.dest.display()
        )
    })?;
    let expected = sha256_file(&copy.source)
        .with_context(|| format!("hash {}", copy.source.display()))?;
    let actual =
        sha256_file(&copy.dest).with_context(|| format!("hash {}", copy.dest.display()))?;
    if expected != actual {
        return Err(anyhow!(
            "sha256 mismatch after copying {}",
            copy.source.display()
        ));
    }
    Ok(())
}
