//! Error types for the acceptance harness

use thiserror::Error;

use crate::probe::ProbeError;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Schema compile error for {name}: {reason}")]
    SchemaCompile { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Why a step stopped its scenario.
///
/// `Skip` is reserved for infrastructure that is not reachable in the
/// current environment; everything else is a `Fail`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("skipped: {0}")]
    Skip(String),

    #[error("{0}")]
    Fail(String),
}

impl StepError {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip(reason.into())
    }
}

impl From<ProbeError> for StepError {
    fn from(err: ProbeError) -> Self {
        // Network-level failures never count as regressions
        match err {
            ProbeError::Unreachable { url, .. } => Self::Skip(format!(
                "service not available at {url}; \
                 expected when it is not running in this environment"
            )),
            ProbeError::Transport { url, source } => {
                Self::Skip(format!("could not verify service at {url}: {source}"))
            }
        }
    }
}

impl From<crate::assertions::AssertionError> for StepError {
    fn from(err: crate::assertions::AssertionError) -> Self {
        Self::Fail(err.to_string())
    }
}

impl From<crate::session::AuthError> for StepError {
    fn from(err: crate::session::AuthError) -> Self {
        match err {
            crate::session::AuthError::Unreachable(probe) => probe.into(),
            other => Self::Fail(other.to_string()),
        }
    }
}

pub type StepResult = Result<(), StepError>;
