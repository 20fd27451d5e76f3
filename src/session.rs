//! The owning session: config, stub directory and search-path state.
//!
//! A [`FakeSession`] is the only thing that writes to its stub directory or
//! edits the search path on its behalf. Running two enabled sessions against
//! the same process environment is unsupported.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{FakeConfig, Rule};
use crate::error::FakeError;
use crate::interpreter::Interpreter;
use crate::paths::SearchDirs;
use crate::search_path::{activate, deactivate, PathEnv, ProcessEnv};
use crate::stubdir::{Artifact, StubDir};
use crate::synth::{synthesize, StubPlan};

/// Default stub directory, under the system temp dir.
pub fn default_stub_dir() -> PathBuf {
    env::temp_dir().join("fakebin").join("binaries")
}

/// Fake commands plus the state needed to install and remove them.
#[derive(Debug)]
pub struct FakeSession<E: PathEnv = ProcessEnv> {
    config: FakeConfig,
    search: SearchDirs,
    stub_dir: StubDir,
    interpreter: Interpreter,
    env: E,
    enabled: bool,
}

impl FakeSession<ProcessEnv> {
    /// Build a session against the process environment.
    ///
    /// `config` and `raw` are mutually exclusive; giving both fails with
    /// [`FakeError::MultipleSources`]. Giving neither yields a session with
    /// no commands.
    pub fn new(config: Option<&Path>, raw: Option<&str>) -> Result<Self> {
        Self::with_env(config, raw, ProcessEnv)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(Some(path), None)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Self::new(None, Some(raw))
    }
}

impl<E: PathEnv> FakeSession<E> {
    /// Build a session against an explicit environment.
    pub fn with_env(config: Option<&Path>, raw: Option<&str>, env: E) -> Result<Self> {
        let interpreter = Interpreter::discover_in(env.get().as_deref());
        let mut session = Self {
            config: FakeConfig::default(),
            search: SearchDirs::new(),
            stub_dir: StubDir::new(default_stub_dir()),
            interpreter,
            env,
            enabled: false,
        };
        match (config, raw) {
            (Some(_), Some(_)) => return Err(anyhow!(FakeError::MultipleSources)),
            (Some(path), None) => session.load_file(path)?,
            (None, Some(raw)) => session.config = FakeConfig::parse(raw)?,
            (None, None) => {}
        }
        Ok(session)
    }

    /// Merge another config file into this session.
    ///
    /// The file's directory joins the output-file search list after any
    /// already known; its commands replace same-named ones.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let loaded = FakeConfig::load(path)?;
        self.search.push_config_file(path)?;
        self.config.merge(loaded);
        Ok(())
    }

    /// Add a directory to search for `output_file` values.
    pub fn add_search_dir(&mut self, dir: &Path) -> Result<()> {
        self.search.push_dir(dir)
    }

    pub fn commands(&self) -> &BTreeMap<String, Vec<Rule>> {
        self.config.commands()
    }

    pub fn stub_dir(&self) -> &Path {
        self.stub_dir.root()
    }

    /// Shell named in every stub's shebang line.
    pub fn interpreter(&self) -> &Path {
        &self.interpreter.shell
    }

    /// Directories searched for `output_file` values, in load order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        self.search.dirs()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Point the session at another stub directory.
    ///
    /// Ignored while enabled. Relative paths are made absolute so the search
    /// path entry does not depend on the working directory.
    pub fn set_stub_dir(&mut self, dir: &Path) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        let dir = std::path::absolute(dir)
            .with_context(|| format!("resolve stub dir {}", dir.display()))?;
        self.stub_dir = StubDir::new(dir);
        Ok(())
    }

    /// Plan every stub without touching disk.
    pub fn plan(&self) -> Result<Vec<StubPlan>> {
        self.config
            .commands()
            .iter()
            .map(|(command, rules)| {
                synthesize(
                    command,
                    rules,
                    &self.interpreter,
                    self.stub_dir.root(),
                    &self.search,
                )
            })
            .collect()
    }

    /// Script text for one command.
    pub fn render(&self, command: &str) -> Result<String> {
        let rules = self
            .config
            .rules(command)
            .ok_or_else(|| anyhow!("command {command} is not faked"))?;
        let plan = synthesize(
            command,
            rules,
            &self.interpreter,
            self.stub_dir.root(),
            &self.search,
        )?;
        Ok(plan.script)
    }

    /// Write every stub and put the stub directory on the search path.
    ///
    /// All stubs are planned first, so a missing output file fails before
    /// anything is written. Enabling again regenerates the directory.
    pub fn enable(&mut self) -> Result<()> {
        let plans = self.plan()?;
        if self.enabled {
            self.stub_dir.remove()?;
        }
        if let Err(err) = self.write_all(&plans) {
            if let Err(cleanup) = self.disable() {
                warn!(error = %cleanup, "failed to clean up stub dir");
            }
            return Err(err);
        }
        activate(&mut self.env, self.stub_dir.root())?;
        self.enabled = true;
        info!(
            dir = %self.stub_dir.root().display(),
            commands = plans.len(),
            "fake commands enabled"
        );
        Ok(())
    }

    /// Write every stub without touching the search path.
    pub fn install(&self) -> Result<Vec<StubPlan>> {
        let plans = self.plan()?;
        self.write_all(&plans)?;
        Ok(plans)
    }

    /// Remove the stub directory and its search-path entry.
    ///
    /// Safe to call when not enabled or when the directory is already gone.
    pub fn disable(&mut self) -> Result<()> {
        self.stub_dir.remove()?;
        deactivate(&mut self.env, self.stub_dir.root())?;
        if self.enabled {
            info!(dir = %self.stub_dir.root().display(), "fake commands disabled");
        }
        self.enabled = false;
        Ok(())
    }

    /// Files currently present in the stub directory.
    pub fn inventory(&self) -> Result<Vec<Artifact>> {
        self.stub_dir.inventory()
    }

    fn write_all(&self, plans: &[StubPlan]) -> Result<()> {
        self.stub_dir.create()?;
        for plan in plans {
            self.stub_dir.write(plan)?;
        }
        Ok(())
    }
}

impl<E: PathEnv> Drop for FakeSession<E> {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.disable() {
            warn!(error = %err, "failed to disable fake commands on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_path::MemoryEnv;
    use std::fs;

    const LS_CONFIG: &str = "ls:\n  - args: [\"omelette\", \"du\", \"fromage\"]\n    return_code: 4\n    output: \"Dexter ??\\n\"\necho:\n";

    fn memory_session(raw: &str, stub_dir: &Path) -> FakeSession<MemoryEnv> {
        let mut session =
            FakeSession::with_env(None, Some(raw), MemoryEnv::new(Some("/usr/bin:/bin")))
                .expect("session");
        session.set_stub_dir(stub_dir).expect("set stub dir");
        session
    }

    fn path_value(session: &FakeSession<MemoryEnv>) -> Option<String> {
        session
            .env()
            .value()
            .map(|value| value.to_string_lossy().into_owned())
    }

    #[test]
    fn both_sources_is_an_error() {
        let err = FakeSession::with_env(
            Some(Path::new("fakes.yml")),
            Some("ls:\n"),
            MemoryEnv::default(),
        )
        .expect_err("multiple sources");
        assert!(matches!(
            err.downcast_ref::<FakeError>(),
            Some(FakeError::MultipleSources)
        ));
    }

    #[test]
    fn no_sources_yields_empty_session() {
        let session = FakeSession::with_env(None, None, MemoryEnv::default()).expect("session");
        assert!(session.commands().is_empty());
        assert!(!session.is_enabled());
    }

    #[test]
    fn enable_and_disable_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        let mut session = memory_session(LS_CONFIG, &stub_dir);

        session.enable().expect("enable");
        assert!(session.is_enabled());
        assert!(stub_dir.join("ls").is_file());
        assert!(stub_dir.join("echo").is_file());
        let expected = format!("{}:/usr/bin:/bin", stub_dir.display());
        assert_eq!(path_value(&session).as_deref(), Some(expected.as_str()));

        session.disable().expect("disable");
        assert!(!stub_dir.exists());
        assert_eq!(path_value(&session).as_deref(), Some("/usr/bin:/bin"));
        session.disable().expect("disable again");
    }

    #[test]
    fn enable_twice_regenerates_without_duplicates() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        let mut session = memory_session(LS_CONFIG, &stub_dir);
        session.enable().expect("enable");
        fs::write(stub_dir.join("stray"), "x").expect("write stray");
        session.enable().expect("enable again");

        let names: Vec<PathBuf> = session
            .inventory()
            .expect("inventory")
            .into_iter()
            .map(|artifact| artifact.path)
            .collect();
        assert_eq!(names, vec![PathBuf::from("echo"), PathBuf::from("ls")]);
        let expected = format!("{}:/usr/bin:/bin", stub_dir.display());
        assert_eq!(path_value(&session).as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn stub_dir_is_fixed_once_enabled() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        let mut session = memory_session("echo:\n", &stub_dir);
        session.enable().expect("enable");
        session
            .set_stub_dir(&temp.path().join("elsewhere"))
            .expect("set stub dir");
        assert_eq!(session.stub_dir(), stub_dir.as_path());
    }

    #[test]
    fn missing_output_file_writes_nothing() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        let mut session = memory_session(
            "echo:\ncat:\n  - return_code: 0\n    output_file: absent.txt\n",
            &stub_dir,
        );
        let err = session.enable().expect_err("missing output file");
        assert!(matches!(
            err.downcast_ref::<FakeError>(),
            Some(FakeError::OutputFileMissing { .. })
        ));
        assert!(!stub_dir.exists());
        assert!(!session.is_enabled());
        assert_eq!(path_value(&session).as_deref(), Some("/usr/bin:/bin"));
    }

    #[test]
    fn output_file_resolves_next_to_config() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cfg_dir = temp.path().join("cfg");
        fs::create_dir_all(&cfg_dir).expect("create cfg dir");
        fs::write(cfg_dir.join("listing.txt"), "one\ntwo\n").expect("write listing");
        let cfg = cfg_dir.join("fakes.yml");
        fs::write(&cfg, "ls:\n  - return_code: 0\n    output_file: listing.txt\n")
            .expect("write config");

        let mut session =
            FakeSession::with_env(Some(cfg.as_path()), None, MemoryEnv::new(Some("/bin")))
                .expect("session");
        assert_eq!(
            session.search_dirs(),
            &[fs::canonicalize(&cfg_dir).expect("canonical cfg dir")][..]
        );
        let stub_dir = temp.path().join("stubs");
        session.set_stub_dir(&stub_dir).expect("set stub dir");
        session.enable().expect("enable");

        let copied = fs::read(stub_dir.join("ls_files/listing.txt")).expect("read copy");
        assert_eq!(copied, b"one\ntwo\n");
        let script = session.render("ls").expect("render");
        assert!(script.contains("ls_files/listing.txt"));
    }

    #[test]
    fn failed_write_rolls_back() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        fs::create_dir_all(&stub_dir).expect("create stub dir");
        fs::write(stub_dir.join("cat_files"), "not a dir").expect("write blocker");
        let mut session = memory_session(
            "echo:\ncat:\n  - return_code: 3\n    output_file:\n",
            &stub_dir,
        );

        assert!(session.enable().is_err());
        assert!(!session.is_enabled());
        assert!(!stub_dir.exists());
        assert_eq!(path_value(&session).as_deref(), Some("/usr/bin:/bin"));
    }

    #[test]
    fn output_files_sharing_a_name_keep_their_content() {
        let temp = tempfile::tempdir().expect("temp dir");
        let data = temp.path().join("data");
        for (dir, body) in [("a", "AAA"), ("b", "BBB")] {
            fs::create_dir_all(data.join(dir)).expect("create data dir");
            fs::write(data.join(dir).join("out.txt"), body).expect("write data");
        }
        let mut session = memory_session(
            "tool:\n  - args: [a]\n    return_code: 0\n    output_file: a/out.txt\n  - args: [b]\n    return_code: 0\n    output_file: b/out.txt\n",
            &temp.path().join("stubs"),
        );
        session.add_search_dir(&data).expect("add search dir");
        session.enable().expect("enable");

        let files = session.stub_dir().join("tool_files");
        assert_eq!(fs::read_to_string(files.join("out.txt")).expect("read a"), "AAA");
        assert_eq!(fs::read_to_string(files.join("2_out.txt")).expect("read b"), "BBB");
    }

    #[test]
    fn drop_disables_enabled_session() {
        let temp = tempfile::tempdir().expect("temp dir");
        let stub_dir = temp.path().join("stubs");
        {
            let mut session = memory_session("echo:\n", &stub_dir);
            session.enable().expect("enable");
            assert!(stub_dir.exists());
        }
        assert!(!stub_dir.exists());
    }

    #[test]
    fn render_unknown_command_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let session = memory_session("echo:\n", &temp.path().join("stubs"));
        assert!(session.render("ls").is_err());
        assert_eq!(
            session.render("echo").expect("render"),
            format!("#!{}\n\nexit 0\n", session.interpreter().display())
        );
    }
}
