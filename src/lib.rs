//! Fake command stubs for tests.
//!
//! A [`FakeSession`] reads a YAML description of commands, writes one small
//! shell script per command into a stub directory, and puts that directory at
//! the front of `PATH`. Each script compares its positional arguments against
//! the configured rules, most specific first, and answers with the matching
//! rule's output and exit code.
//!
//! ```no_run
//! use fakebin::FakeSession;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut fakes = FakeSession::from_yaml(
//!     "ls:\n  - args: [\"-l\"]\n    return_code: 2\n    output: \"nope\\n\"\n",
//! )?;
//! fakes.enable()?;
//! // `ls -l` now prints "nope" and exits 2.
//! fakes.disable()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hashing;
pub mod interpreter;
pub mod logging;
pub mod paths;
pub mod script;
pub mod search_path;
pub mod session;
pub mod stubdir;
pub mod synth;

pub use config::{FakeConfig, Rule, RuleOutput};
pub use error::{FakeError, SchemaIssue};
pub use interpreter::Interpreter;
pub use paths::SearchDirs;
pub use script::{Branch, Emit, ScriptBuilder, DEFAULT_EXIT_CODE};
pub use search_path::{activate, deactivate, MemoryEnv, PathEnv, ProcessEnv};
pub use session::{default_stub_dir, FakeSession};
pub use stubdir::{Artifact, StubDir};
pub use synth::{order_rules, synthesize, StubPlan};
