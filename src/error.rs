//! Error kinds callers may need to tell apart.
//!
//! Everything else is reported as a plain `anyhow::Error` with context. These
//! variants travel inside `anyhow::Error` and can be recovered with
//! `err.downcast_ref::<FakeError>()`.

use std::fmt;
use std::path::PathBuf;

/// A single schema problem found while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Where the problem is, e.g. `ls[1].return_code`.
    pub location: String,
    pub message: String,
}

impl SchemaIssue {
    pub(crate) fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

#[derive(Debug)]
pub enum FakeError {
    /// Both a config file and raw configuration text were supplied.
    MultipleSources,
    /// Configuration failed validation; every issue found is listed.
    Schema(Vec<SchemaIssue>),
    /// An `output_file` could not be found in any search directory.
    OutputFileMissing {
        command: String,
        file: PathBuf,
        searched: Vec<PathBuf>,
    },
}

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FakeError::MultipleSources => {
                write!(f, "config file and raw config are mutually exclusive")
            }
            FakeError::Schema(issues) => {
                write!(f, "config failed validation ({} issue", issues.len())?;
                if issues.len() != 1 {
                    write!(f, "s")?;
                }
                write!(f, ")")?;
                for issue in issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
            FakeError::OutputFileMissing {
                command,
                file,
                searched,
            } => {
                write!(
                    f,
                    "output file {} for command {command} not found",
                    file.display()
                )?;
                if searched.is_empty() {
                    write!(f, " (no search directories)")
                } else {
                    let dirs: Vec<String> =
                        searched.iter().map(|dir| dir.display().to_string()).collect();
                    write!(f, " (searched {})", dirs.join(", "))
                }
            }
        }
    }
}

impl std::error::Error for FakeError {}
