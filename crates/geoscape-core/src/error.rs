//! Fatal configuration errors.
//!
//! These indicate broken ruleset or mod content. They are never recovered
//! from: any `Err(ConfigError)` returned by the engine ends the session.
//! Expected "nothing to do this month" outcomes are plain `Option`/`bool`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse ruleset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read ruleset from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error in mission scripts: {script}: label {label} is shared by two or more commands")]
    DuplicateLabel { script: String, label: u32 },
    #[error("{context}: {kind} `{name}` is not defined")]
    Undefined {
        context: String,
        kind: &'static str,
        name: String,
    },
    #[error("mission script {script}: maxRuns and avoidRepeats require a varName")]
    MissingVarName { script: String },
    #[error("mission script {script}: mission type {mission} has no available races")]
    NoRaces { script: String, mission: String },
    #[error("alien mission {mission} creates {what} but has no deployment")]
    MissingDeployment { mission: String, what: &'static str },
}

impl ConfigError {
    pub fn undefined(context: impl Into<String>, kind: &'static str, name: impl Into<String>) -> Self {
        ConfigError::Undefined {
            context: context.into(),
            kind,
            name: name.into(),
        }
    }
}
