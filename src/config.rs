//! Fake-command configuration: YAML loading and typed validation.
//!
//! A config maps command names to a list of rules:
//!
//! ```yaml
//! ls:
//!   - args: ["omelette", "du", "fromage"]
//!     return_code: 4
//!     output: "Dexter ??\n"
//!   - return_code: 0
//!     output_file: listing.txt
//! echo:
//! ```
//!
//! Validation runs over the whole document and reports every problem it finds
//! rather than stopping at the first one.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FakeError, SchemaIssue};
use crate::paths::validate_command_name;

/// Rule shape as written in YAML, before validation.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default)]
    args: Option<Vec<Value>>,
    #[serde(default, alias = "returnCode")]
    return_code: Option<i64>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default, alias = "outputFile", deserialize_with = "present")]
    output_file: Option<Option<String>>,
}

/// Distinguish `output_file:` (present, null) from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// What a matched rule writes to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutput {
    /// Nothing is written.
    Silent,
    /// Literal text, emitted verbatim.
    Literal(String),
    /// Contents of a file copied into the stub directory. `None` means the key
    /// was given without a value: the files directory is still created but
    /// nothing is emitted.
    File(Option<PathBuf>),
}

/// One argument pattern and the response it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Positional values matched exactly; empty means catch-all.
    pub args: Vec<String>,
    pub return_code: u8,
    pub output: RuleOutput,
}

impl Rule {
    pub fn is_default(&self) -> bool {
        self.args.is_empty()
    }
}

/// Validated configuration: command name to ordered rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeConfig {
    commands: BTreeMap<String, Vec<Rule>>,
}

impl FakeConfig {
    /// Parse and validate configuration text.
    ///
    /// Schema problems are reported as [`FakeError::Schema`].
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(text).context("parse config YAML")?;
        validate_document(&document).map_err(|issues| anyhow!(FakeError::Schema(issues)))
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("load config {}", path.display()))
    }

    /// Merge `other` into this config; commands in `other` replace ours.
    pub fn merge(&mut self, other: FakeConfig) {
        self.commands.extend(other.commands);
    }

    pub fn commands(&self) -> &BTreeMap<String, Vec<Rule>> {
        &self.commands
    }

    pub fn rules(&self, command: &str) -> Option<&[Rule]> {
        self.commands.get(command).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Validate a parsed YAML document into a [`FakeConfig`].
pub fn validate_document(document: &Value) -> Result<FakeConfig, Vec<SchemaIssue>> {
    let mapping = match document {
        Value::Null => return Ok(FakeConfig::default()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(vec![SchemaIssue::new(
                "<root>",
                "expected a mapping of command names",
            )])
        }
    };

    let mut issues = Vec::new();
    let mut commands = BTreeMap::new();
    for (key, value) in mapping {
        let name = match key {
            Value::String(name) => name.clone(),
            Value::Number(number) => number.to_string(),
            _ => {
                issues.push(SchemaIssue::new("<root>", "command names must be strings"));
                continue;
            }
        };
        if let Err(err) = validate_command_name(&name) {
            issues.push(SchemaIssue::new(name.as_str(), err.to_string()));
            continue;
        }
        match validate_rules(&name, value) {
            Ok(rules) => {
                commands.insert(name, rules);
            }
            Err(mut found) => issues.append(&mut found),
        }
    }

    if issues.is_empty() {
        Ok(FakeConfig { commands })
    } else {
        Err(issues)
    }
}

fn validate_rules(command: &str, value: &Value) -> Result<Vec<Rule>, Vec<SchemaIssue>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        _ => {
            return Err(vec![SchemaIssue::new(
                command,
                "expected a list of rules or nothing",
            )])
        }
    };

    let mut issues = Vec::new();
    let mut rules = Vec::new();
    let mut default_seen = false;
    for (idx, item) in items.iter().enumerate() {
        let location = format!("{command}[{idx}]");
        let raw: RawRule = match serde_yaml::from_value(item.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                issues.push(SchemaIssue::new(location, err.to_string()));
                continue;
            }
        };
        match validate_rule(&location, raw) {
            Ok(rule) => {
                if rule.is_default() {
                    if default_seen {
                        issues.push(SchemaIssue::new(
                            location,
                            "only one rule without args is allowed",
                        ));
                        continue;
                    }
                    default_seen = true;
                }
                rules.push(rule);
            }
            Err(mut found) => issues.append(&mut found),
        }
    }

    if issues.is_empty() {
        Ok(rules)
    } else {
        Err(issues)
    }
}

fn validate_rule(location: &str, raw: RawRule) -> Result<Rule, Vec<SchemaIssue>> {
    let mut issues = Vec::new();

    let mut args = Vec::new();
    for (idx, value) in raw.args.unwrap_or_default().iter().enumerate() {
        match scalar_text(value) {
            Some(text) => args.push(text),
            None => issues.push(SchemaIssue::new(
                format!("{location}.args[{idx}]"),
                "expected a string, number or bool",
            )),
        }
    }

    let return_code = match raw.return_code {
        None => {
            issues.push(SchemaIssue::new(
                format!("{location}.return_code"),
                "is required",
            ));
            None
        }
        Some(code) => match u8::try_from(code) {
            Ok(code) => Some(code),
            Err(_) => {
                issues.push(SchemaIssue::new(
                    format!("{location}.return_code"),
                    format!("{code} is outside 0..=255"),
                ));
                None
            }
        },
    };

    let output = match (raw.output, raw.output_file) {
        (Some(_), Some(_)) => {
            issues.push(SchemaIssue::new(
                location,
                "output and output_file are mutually exclusive",
            ));
            None
        }
        (Some(text), None) => Some(RuleOutput::Literal(text)),
        (None, Some(file)) => Some(RuleOutput::File(
            file.filter(|file| !file.trim().is_empty()).map(PathBuf::from),
        )),
        (None, None) => Some(RuleOutput::Silent),
    };

    match (return_code, output) {
        (Some(return_code), Some(output)) if issues.is_empty() => Ok(Rule {
            args,
            return_code,
            output,
        }),
        _ => Err(issues),
    }
}

/// Text a scalar argument is matched as; `5` matches the argument `5`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
