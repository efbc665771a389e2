//! Health records for the monitored services

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Endpoints;
use crate::probe::ProbeResponse;

/// Which health payload convention a service follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Framework-managed endpoint (`status` and/or `components`)
    Framework,

    /// Hand-rolled endpoint (`status` plus version/uptime or checks)
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
    Unknown,
}

impl HealthStatus {
    pub const ALL: [HealthStatus; 3] = [Self::Up, Self::Down, Self::Unknown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Exact, case-sensitive match
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service swept by the per-service health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredService {
    pub name: &'static str,
    pub base_uri: String,
    pub path: &'static str,
    pub kind: ServiceKind,
}

impl MonitoredService {
    /// The five application services, in sweep order
    pub fn all(endpoints: &Endpoints) -> Vec<Self> {
        vec![
            Self {
                name: "api-gateway",
                base_uri: endpoints.gateway.clone(),
                path: "/actuator/health",
                kind: ServiceKind::Framework,
            },
            Self {
                name: "gestion-perfil",
                base_uri: endpoints.profile.clone(),
                path: "/actuator/health",
                kind: ServiceKind::Framework,
            },
            Self {
                name: "jwt-service",
                base_uri: endpoints.auth.clone(),
                path: "/v1/health",
                kind: ServiceKind::Custom,
            },
            Self {
                name: "notifications",
                base_uri: endpoints.notifications.clone(),
                path: "/health",
                kind: ServiceKind::Custom,
            },
            Self {
                name: "orquestador",
                base_uri: endpoints.orchestrator.clone(),
                path: "/health",
                kind: ServiceKind::Custom,
            },
        ]
    }
}

/// Only the gateway and the profile service expose framework-managed health
pub fn service_kind(service_name: &str) -> ServiceKind {
    match service_name {
        "api-gateway" | "gestion-perfil" => ServiceKind::Framework,
        _ => ServiceKind::Custom,
    }
}

/// Parsed health payload of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealthRecord {
    pub service_name: String,
    pub status: HealthStatus,
    pub raw: Value,
}

impl ServiceHealthRecord {
    /// A missing or unrecognized `status` is recorded as `UNKNOWN`
    pub fn from_response(service_name: &str, response: &ProbeResponse) -> Self {
        let raw = response.json().unwrap_or(Value::Null);
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .and_then(HealthStatus::parse)
            .unwrap_or(HealthStatus::Unknown);
        Self {
            service_name: service_name.to_string(),
            status,
            raw,
        }
    }

    /// The `status` string exactly as the service sent it
    pub fn reported_status(&self) -> Option<&str> {
        self.raw.get("status").and_then(Value::as_str)
    }
}

/// Health record mapping as reported by the aggregator; entries that are not
/// objects are left out
pub fn records_from_global(body: &Value) -> BTreeMap<String, ServiceHealthRecord> {
    let Some(services) = body.as_object() else {
        return BTreeMap::new();
    };

    services
        .iter()
        .filter(|(_, entry)| entry.is_object())
        .map(|(name, entry)| {
            let status = entry
                .get("status")
                .and_then(Value::as_str)
                .and_then(HealthStatus::parse)
                .unwrap_or(HealthStatus::Unknown);
            (
                name.clone(),
                ServiceHealthRecord {
                    service_name: name.clone(),
                    status,
                    raw: entry.clone(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!(HealthStatus::parse("UP"), Some(HealthStatus::Up));
        assert_eq!(HealthStatus::parse("DOWN"), Some(HealthStatus::Down));
        assert_eq!(HealthStatus::parse("UNKNOWN"), Some(HealthStatus::Unknown));
        assert_eq!(HealthStatus::parse("up"), None);
        assert_eq!(HealthStatus::parse("ACTIVE"), None);
        assert_eq!(HealthStatus::parse(""), None);
    }

    #[test]
    fn test_service_kind_precedence() {
        assert_eq!(service_kind("api-gateway"), ServiceKind::Framework);
        assert_eq!(service_kind("gestion-perfil"), ServiceKind::Framework);
        assert_eq!(service_kind("jwt-service"), ServiceKind::Custom);
        assert_eq!(service_kind("anything-else"), ServiceKind::Custom);

        let endpoints = Endpoints::default();
        for service in MonitoredService::all(&endpoints) {
            assert_eq!(service.kind, service_kind(service.name));
        }
    }

    #[test]
    fn test_record_from_response() {
        let response = ProbeResponse::new(200, r#"{"status":"DOWN","version":"1.0"}"#);
        let record = ServiceHealthRecord::from_response("notifications", &response);
        assert_eq!(record.status, HealthStatus::Down);
        assert_eq!(record.raw["version"], "1.0");

        let garbled = ServiceHealthRecord::from_response("x", &ProbeResponse::new(500, "oops"));
        assert_eq!(garbled.status, HealthStatus::Unknown);
        assert_eq!(garbled.raw, Value::Null);
        assert_eq!(garbled.reported_status(), None);

        let odd = ProbeResponse::new(200, r#"{"status":"up"}"#);
        let odd = ServiceHealthRecord::from_response("x", &odd);
        assert_eq!(odd.status, HealthStatus::Unknown);
        assert_eq!(odd.reported_status(), Some("up"));
    }

    #[test]
    fn test_records_from_global() {
        let body = json!({
            "jwt-service": { "status": "UP" },
            "orquestador": { "status": "weird" },
            "bogus": "not an object"
        });
        let records = records_from_global(&body);
        assert_eq!(records.len(), 2);
        assert_eq!(records["jwt-service"].status, HealthStatus::Up);
        assert_eq!(records["orquestador"].status, HealthStatus::Unknown);

        assert!(records_from_global(&json!({})).is_empty());
        assert!(records_from_global(&json!([1, 2])).is_empty());
    }
}
