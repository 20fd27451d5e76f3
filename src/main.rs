//! Command-line front end for fake command stubs.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use fakebin::hashing::sha256_hex;
use fakebin::{logging, FakeError, FakeSession, StubPlan};

/// CLI arguments for the stub generator.
#[derive(Parser, Debug)]
#[command(name = "fakebin", version, about = "Generate fake command stubs for tests")]
struct Args {
    /// Log progress to stderr (FAKEBIN_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Validate a config file and list any schema problems
    Check {
        /// Path to the YAML config
        config: PathBuf,
    },
    /// Print the stub script generated for one command
    Render {
        /// Path to the YAML config
        config: PathBuf,
        /// Faked command name
        command: String,
    },
    /// Write stubs to a directory without touching PATH
    Install {
        /// Path to the YAML config
        config: PathBuf,
        /// Stub directory
        #[arg(long, value_name = "DIR")]
        dir: PathBuf,
        /// Print a JSON summary instead of the directory
        #[arg(long)]
        json: bool,
    },
    /// Run a command with the stubs first on PATH, then clean up
    Run {
        /// Path to the YAML config
        config: PathBuf,
        /// Stub directory (defaults to the system temp dir)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Command and arguments to run
        #[arg(last = true, required = true)]
        argv: Vec<String>,
    },
}

/// JSON summary written by `install --json`.
#[derive(Serialize)]
struct InstallReport {
    stub_dir: String,
    interpreter: String,
    stubs: Vec<StubReport>,
}

#[derive(Serialize)]
struct StubReport {
    command: String,
    path: String,
    sha256: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logging::init(args.verbose) {
        eprintln!("warning: {err:#}");
    }
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Cmd::Check { config } => {
            let session = FakeSession::from_file(&config)?;
            session.plan()?;
            for (command, rules) in session.commands() {
                println!("{command}: {} rule(s)", rules.len());
            }
            for dir in session.search_dirs() {
                println!("output files from {}", dir.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Render { config, command } => {
            let session = FakeSession::from_file(&config)?;
            print!("{}", session.render(&command)?);
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Install { config, dir, json } => {
            let mut session = FakeSession::from_file(&config)?;
            session.set_stub_dir(&dir)?;
            let plans = session.install()?;
            if json {
                let report = install_report(&session, &plans);
                let text =
                    serde_json::to_string_pretty(&report).context("serialize install report")?;
                println!("{text}");
            } else {
                println!("{}", session.stub_dir().display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Run { config, dir, argv } => run_with_stubs(&config, dir.as_deref(), &argv),
    }
}

fn run_with_stubs(config: &Path, dir: Option<&Path>, argv: &[String]) -> Result<ExitCode> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| anyhow!("no command given"))?;
    let mut session = FakeSession::from_file(config)?;
    if let Some(dir) = dir {
        session.set_stub_dir(dir)?;
    }
    session.enable()?;
    let status = Command::new(program).args(rest).status();
    session.disable()?;
    let status = status.with_context(|| format!("spawn {program}"))?;

    let code = match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    };
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

fn install_report(session: &FakeSession, plans: &[StubPlan]) -> InstallReport {
    InstallReport {
        stub_dir: session.stub_dir().display().to_string(),
        interpreter: session.interpreter().display().to_string(),
        stubs: plans
            .iter()
            .map(|plan| StubReport {
                command: plan.command.clone(),
                path: plan.layout.script.display().to_string(),
                sha256: sha256_hex(plan.script.as_bytes()),
                files: plan
                    .copies
                    .iter()
                    .map(|copy| copy.dest.display().to_string())
                    .collect(),
            })
            .collect(),
    }
}

fn report(err: &anyhow::Error) {
    if let Some(FakeError::Schema(issues)) = err.downcast_ref::<FakeError>() {
        eprintln!("error: config failed validation");
        for issue in issues {
            eprintln!("  {issue}");
        }
        return;
    }
    eprintln!("error: {err:#}");
}
