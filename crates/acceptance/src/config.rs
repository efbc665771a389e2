//! Harness configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The runner binary applies CLI flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Base URIs of every service the harness talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// API gateway
    pub gateway: String,

    /// Profile-management service
    pub profile: String,

    /// JWT/auth service
    pub auth: String,

    /// Path prefix for the auth service API
    pub auth_base_path: String,

    /// Notifications service
    pub notifications: String,

    /// Orchestrator
    pub orchestrator: String,

    /// Health-aggregation service
    pub monitor: String,

    /// Log-aggregation backend
    pub log_backend: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gateway: "http://localhost:8085".to_string(),
            profile: "http://localhost:8084".to_string(),
            auth: "http://localhost:8081".to_string(),
            auth_base_path: "/v1".to_string(),
            notifications: "http://localhost:8080".to_string(),
            orchestrator: "http://localhost:3001".to_string(),
            monitor: "http://localhost:8082".to_string(),
            log_backend: "http://localhost:3100".to_string(),
        }
    }
}

impl Endpoints {
    /// Auth service base including its path prefix, e.g. `http://localhost:8081/v1`
    pub fn auth_api(&self) -> String {
        format!(
            "{}{}",
            self.auth.trim_end_matches('/'),
            normalize_path(&self.auth_base_path)
        )
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str, slot: &mut String| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        };

        set(EnvKey::GATEWAY, &mut self.gateway);
        set(EnvKey::PROFILE, &mut self.profile);
        set(EnvKey::AUTH, &mut self.auth);
        set(EnvKey::NOTIFICATIONS, &mut self.notifications);
        set(EnvKey::ORCHESTRATOR, &mut self.orchestrator);
        set(EnvKey::MONITOR, &mut self.monitor);
        set(EnvKey::LOG_BACKEND, &mut self.log_backend);
        // Run-level override for the auth service under test
        set(EnvKey::BASE_URL, &mut self.auth);
        set(EnvKey::BASE_PATH, &mut self.auth_base_path);
    }
}

/// Environment variable names
pub struct EnvKey;

impl EnvKey {
    pub const GATEWAY: &'static str = "API_GATEWAY_URL";
    pub const PROFILE: &'static str = "GESTION_PERFIL_URL";
    pub const AUTH: &'static str = "JWT_SERVICE_URL";
    pub const NOTIFICATIONS: &'static str = "NOTIFICATIONS_URL";
    pub const ORCHESTRATOR: &'static str = "ORQUESTADOR_URL";
    pub const MONITOR: &'static str = "HEALTH_CHECK_URL";
    pub const LOG_BACKEND: &'static str = "LOKI_URL";
    pub const BASE_URL: &'static str = "ACCEPTANCE_BASE_URL";
    pub const BASE_PATH: &'static str = "ACCEPTANCE_BASE_PATH";
    pub const ADMIN_PROVISIONING: &'static str = "ACCEPTANCE_ADMIN_PROVISIONING";
}

/// How the admin account comes to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminProvisioning {
    /// Loaded by the environment's fixture scripts before the suite runs
    #[default]
    PreSeeded,

    /// Registered by the harness after the first failed admin login
    LazyRegister,
}

impl std::str::FromStr for AdminProvisioning {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pre_seeded" | "preseeded" => Ok(Self::PreSeeded),
            "lazy_register" | "lazy" => Ok(Self::LazyRegister),
            other => Err(HarnessError::Config(format!(
                "unknown admin provisioning mode: {other}"
            ))),
        }
    }
}

/// Admin account used by `login_as_admin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

/// How long to wait for the log backend to ingest a freshly emitted log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LogSettle {
    /// Sleep for a fixed delay
    FixedDelay {
        #[serde(default = "default_settle_ms")]
        delay_ms: u64,
    },

    /// Poll the backend readiness endpoint until it answers 200
    Poll {
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
        #[serde(default = "default_poll_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for LogSettle {
    fn default() -> Self {
        Self::FixedDelay {
            delay_ms: default_settle_ms(),
        }
    }
}

impl LogSettle {
    /// Polling with the same interval and timeout a bare `strategy = "poll"` gets
    pub fn poll_default() -> Self {
        Self::Poll {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_poll_timeout_ms() -> u64 {
    10_000
}

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub endpoints: Endpoints,

    pub admin: AdminCredentials,

    pub admin_provisioning: AdminProvisioning,

    pub log_settle: LogSettle,

    /// Per-request timeout; `None` keeps the client default
    pub request_timeout_ms: Option<u64>,

    /// Directory holding scenario YAML documents
    pub scenarios_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            admin: AdminCredentials::default(),
            admin_provisioning: AdminProvisioning::default(),
            log_settle: LogSettle::default(),
            request_timeout_ms: None,
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

impl HarnessConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> HarnessResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn apply_env(&mut self) -> HarnessResult<()> {
        self.endpoints.apply_env();
        if let Ok(mode) = std::env::var(EnvKey::ADMIN_PROVISIONING) {
            self.admin_provisioning = mode.parse()?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
