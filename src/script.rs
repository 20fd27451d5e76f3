//! Stub script rendering from structured branches.
//!
//! Branch ordering is decided elsewhere; this module only turns an ordered
//! list of branches into POSIX shell text.

use std::path::PathBuf;

use crate::interpreter::Interpreter;

/// Exit status of a stub whose command has no rules.
pub const DEFAULT_EXIT_CODE: u8 = 0;

/// What a branch does once selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    Nothing,
    Text(String),
    /// Print a file copied into the stub directory.
    File(PathBuf),
}

/// One arm of the stub's conditional chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Positional values compared against `$1`, `$2`, ...; empty for the
    /// catch-all arm.
    pub args: Vec<String>,
    pub emit: Emit,
    pub exit_code: u8,
}

impl Branch {
    fn is_conditional(&self) -> bool {
        !self.args.is_empty()
    }
}

/// Collects branches and renders them under an interpreter line.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    shell: PathBuf,
    cat: PathBuf,
    branches: Vec<Branch>,
}

impl ScriptBuilder {
    pub fn new(interpreter: &Interpreter) -> Self {
        Self {
            shell: interpreter.shell.clone(),
            cat: interpreter.cat.clone(),
            branches: Vec::new(),
        }
    }

    pub fn branch(&mut self, branch: Branch) -> &mut Self {
        self.branches.push(branch);
        self
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Render the script.
    ///
    /// Conditional branches become `if`/`elif` arms in push order. A
    /// catch-all branch becomes `else` when a conditional arm precedes it and
    /// runs unconditionally otherwise. Anything pushed after a catch-all is
    /// unreachable and is dropped.
    pub fn render(&self) -> String {
        let mut out = format!("#!{}\n\n", self.shell.display());

        if self.branches.is_empty() {
            out.push_str(&format!("exit {DEFAULT_EXIT_CODE}\n"));
            return out;
        }

        let mut opened = false;
        for branch in &self.branches {
            if branch.is_conditional() {
                let keyword = if opened { "elif" } else { "if" };
                out.push_str(&format!("{keyword} {}; then\n", condition(&branch.args)));
                opened = true;
                self.write_body(&mut out, branch, "  ");
            } else {
                if opened {
                    out.push_str("else\n");
                    self.write_body(&mut out, branch, "  ");
                } else {
                    self.write_body(&mut out, branch, "");
                }
                break;
            }
        }
        if opened {
            out.push_str("fi\n");
        }
        out
    }

    fn write_body(&self, out: &mut String, branch: &Branch, indent: &str) {
        match &branch.emit {
            Emit::Nothing => {}
            Emit::Text(text) => {
                out.push_str(&format!("{indent}printf '%s' {}\n", quote(text)));
            }
            Emit::File(path) => {
                out.push_str(&format!(
                    "{indent}{} {}\n",
                    quote(&self.cat.to_string_lossy()),
                    quote(&path.to_string_lossy())
                ));
            }
        }
        out.push_str(&format!("{indent}exit {}\n", branch.exit_code));
    }
}

fn condition(args: &[String]) -> String {
    args.iter()
        .enumerate()
        .map(|(idx, value)| format!("[ \"${{{}}}\" = {} ]", idx + 1, quote(value)))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Single-quote a value for the shell, closing and reopening the quotes
/// around embedded `'`.
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
