//! Stub synthesis: rule ordering and branch assembly.
//!
//! Synthesis is pure. It decides what a command's stub looks like and which
//! output files must be copied for it, and leaves all disk writes to
//! [`crate::stubdir`]. Planning every command before writing anything keeps a
//! bad config from leaving a half-populated stub directory behind.

use anyhow::{anyhow, Result};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use crate::config::{Rule, RuleOutput};
use crate::error::FakeError;
use crate::interpreter::Interpreter;
use crate::paths::SearchDirs;
use crate::script::{Branch, Emit, ScriptBuilder};

/// Where a command's artifacts live inside the stub directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubLayout {
    pub script: PathBuf,
    pub files_dir: PathBuf,
}

impl StubLayout {
    pub fn new(stub_dir: &Path, command: &str) -> Self {
        Self {
            script: stub_dir.join(command),
            files_dir: stub_dir.join(format!("{command}_files")),
        }
    }
}

/// An output file to copy before the stub is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopy {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Everything needed to materialize one command's stub.
#[derive(Debug, Clone)]
pub struct StubPlan {
    pub command: String,
    pub layout: StubLayout,
    pub script: String,
    /// True when any rule is in output-file mode, even without a file.
    pub needs_files_dir: bool,
    pub copies: Vec<FileCopy>,
}

/// Order rules most-specific first.
///
/// Rules with more positional arguments come first; ties keep their input
/// order.
pub fn order_rules(rules: &[Rule]) -> Vec<&Rule> {
    let mut ordered: Vec<&Rule> = rules.iter().collect();
    ordered.sort_by_key(|rule| Reverse(rule.args.len()));
    ordered
}

/// Plan the stub for `command`.
///
/// Output files are resolved against `search` now; a file that cannot be
/// found is a [`FakeError::OutputFileMissing`] error.
pub fn synthesize(
    command: &str,
    rules: &[Rule],
    interpreter: &Interpreter,
    stub_dir: &Path,
    search: &SearchDirs,
) -> Result<StubPlan> {
    let layout = StubLayout::new(stub_dir, command);
    let mut builder = ScriptBuilder::new(interpreter);
    let mut copies: Vec<FileCopy> = Vec::new();
    let mut needs_files_dir = false;

    for rule in order_rules(rules) {
        let emit = match &rule.output {
            RuleOutput::Silent => Emit::Nothing,
            RuleOutput::Literal(text) => Emit::Text(text.clone()),
            RuleOutput::File(None) => {
                needs_files_dir = true;
                Emit::Nothing
            }
            RuleOutput::File(Some(file)) => {
                needs_files_dir = true;
                let source = resolve_source(command, file, search)?;
                let dest = match copies.iter().find(|copy| copy.source == source) {
                    Some(copy) => copy.dest.clone(),
                    None => {
                        let dest = unique_dest(&layout, &source, &copies)?;
                        copies.push(FileCopy {
                            source,
                            dest: dest.clone(),
                        });
                        dest
                    }
                };
                Emit::File(dest)
            }
        };
        builder.branch(Branch {
            args: rule.args.clone(),
            emit,
            exit_code: rule.return_code,
        });
    }

    Ok(StubPlan {
        command: command.to_string(),
        layout,
        script: builder.render(),
        needs_files_dir,
        copies,
    })
}

fn resolve_source(command: &str, file: &Path, search: &SearchDirs) -> Result<PathBuf> {
    search.resolve(file).ok_or_else(|| {
        anyhow!(FakeError::OutputFileMissing {
            command: command.to_string(),
            file: file.to_path_buf(),
            searched: search.dirs().to_vec(),
        })
    })
}

/// Destination for `source` in the files dir. Distinct sources sharing a base
/// name get a numeric prefix so no copy overwrites another.
fn unique_dest(layout: &StubLayout, source: &Path, copies: &[FileCopy]) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| anyhow!("output file {} has no file name", source.display()))?
        .to_string_lossy()
        .into_owned();
    let taken = |dest: &Path| copies.iter().any(|copy| copy.dest == dest);
    let mut dest = layout.files_dir.join(&name);
    let mut n = 2;
    while taken(&dest) {
        dest = layout.files_dir.join(format!("{n}_{name}"));
        n += 1;
    }
    Ok(dest)
}
