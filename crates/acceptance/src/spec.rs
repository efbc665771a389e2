//! Declarative YAML scenario documents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        };
        f.write_str(word)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub keyword: Keyword,

    #[serde(flatten)]
    pub action: StepAction,
}

impl fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.action.describe())
    }
}

/// A single step action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    // Users against the auth service
    /// Precondition placeholder for the auth service
    ServiceAvailable,
    /// Register a freshly generated user
    RegisterUser,
    /// Register a user and require 200 or 201
    RegisteredUserExists,
    /// Log in as the last registered user
    LoginCorrect,
    /// A non-blank user token was obtained
    ExpectToken,
    RequestRecoveryCode,
    /// Log in with the configured admin account
    LoginAdmin,
    ListUsers {
        page: i64,
    },
    ExpectUserList,
    DeleteLastUser,
    DeleteMissingUser,
    /// Drop any admin token
    NoSession,
    /// Use the last user's token where an admin token is expected
    LoginNonAdmin,

    // Generic checks on the last response
    ExpectStatus {
        code: u16,
    },
    ExpectStatusIn {
        codes: Vec<u16>,
    },
    ExpectBodyNotBlank,
    ExpectSchema {
        schema: String,
    },
    ExpectField {
        pointer: String,
    },

    // Whole-system checks
    SystemDeployed,
    QueryAllHealth,
    ExpectAllServicesStatus {
        status: String,
    },
    ExpectHealthShape,
    ExpectHealthInfo,
    MonitorAvailable,
    QueryGlobalHealth,
    ExpectServicesListed,
    ExpectServiceStatusEnum,
    ExpectMonitorReportsUp,
    GenerateLog,
    QueryLogBackend,
    ExpectLogFound,
    ExpectLogsCentralized,
    MonitorRegistered,
    /// Marker only; stopping a service is outside the harness
    ServiceStopsResponding,
    ExpectFailureDetected,
    ExpectNotificationSent,
    UserRegistersViaGateway,
    UserPerformsOperations,

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

impl StepAction {
    /// Short human-readable text for logs and reports
    pub fn describe(&self) -> String {
        match self {
            Self::ListUsers { page } => format!("list users on page {page}"),
            Self::ExpectStatus { code } => format!("expect status {code}"),
            Self::ExpectStatusIn { codes } => format!("expect status in {codes:?}"),
            Self::ExpectSchema { schema } => format!("expect body matches schema '{schema}'"),
            Self::ExpectField { pointer } => format!("expect field '{pointer}'"),
            Self::ExpectAllServicesStatus { status } => {
                format!("expect all services report '{status}'")
            }
            Self::Log { message } => format!("log '{message}'"),
            other => {
                // Unit variants serialize to just their tag
                serde_json::to_value(other)
                    .ok()
                    .and_then(|v| v.get("action").and_then(|a| a.as_str()).map(str::to_string))
                    .unwrap_or_else(|| format!("{other:?}"))
                    .replace('_', " ")
            }
        }
    }
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(HarnessError::from)
    }

    /// Parse a YAML document holding a list of scenarios
    pub fn list_from_yaml(yaml: &str) -> HarnessResult<Vec<Self>> {
        serde_yaml::from_str(yaml).map_err(HarnessError::from)
    }

    /// Parse every scenario in a YAML file; a file holds one scenario or a list
    pub fn from_file(path: &Path) -> HarnessResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&content)?;
        let parsed = if doc.is_sequence() {
            serde_yaml::from_value::<Vec<Self>>(doc)
        } else {
            serde_yaml::from_value::<Self>(doc).map(|spec| vec![spec])
        };
        parsed.map_err(|e| HarnessError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(HarnessError::SpecParse(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.extend(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.has_tag(tag)).collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: register-valid-user
description: Registering a user with valid data
tags:
  - users
  - smoke
steps:
  - keyword: given
    action: service_available
  - keyword: when
    action: register_user
  - keyword: then
    action: expect_status
    code: 201
  - keyword: and
    action: expect_schema
    schema: message_dto
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "register-valid-user");
        assert_eq!(spec.steps.len(), 4);
        assert_eq!(spec.steps[0].keyword, Keyword::Given);
        assert_eq!(spec.steps[2].action, StepAction::ExpectStatus { code: 201 });
        assert_eq!(
            spec.steps[3].action,
            StepAction::ExpectSchema {
                schema: "message_dto".to_string()
            }
        );
        assert!(spec.has_tag("smoke"));
    }

    #[test]
    fn test_parse_negative_page() {
        let yaml = r#"
name: invalid-page
steps:
  - keyword: when
    action: list_users
    page: -1
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.steps[0].action, StepAction::ListUsers { page: -1 });
    }

    #[test]
    fn test_parse_list_document() {
        let yaml = r#"
- name: a
  tags: [x]
  steps: []
- name: b
  steps:
    - keyword: given
      action: monitor_available
"#;
        let specs = ScenarioSpec::list_from_yaml(yaml).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(ScenarioSpec::filter_by_tag(&specs, "x").len(), 1);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = r#"
name: bad
steps:
  - keyword: when
    action: teleport
"#;
        assert!(ScenarioSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_step_display() {
        let step = ScenarioStep {
            keyword: Keyword::Then,
            action: StepAction::ExpectStatus { code: 404 },
        };
        assert_eq!(step.to_string(), "Then expect status 404");

        let step = ScenarioStep {
            keyword: Keyword::Given,
            action: StepAction::MonitorAvailable,
        };
        assert_eq!(step.to_string(), "Given monitor available");
    }
}
