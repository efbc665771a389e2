//! Per-scenario mutable state
//!
//! A `ScenarioContext` is created fresh for every scenario and dropped when
//! the scenario ends; nothing in it outlives one run.

use std::collections::BTreeMap;

use crate::fixtures::TestUser;
use crate::health::ServiceHealthRecord;
use crate::probe::ProbeResponse;
use crate::session::SessionToken;

#[derive(Debug, Default)]
pub struct ScenarioContext {
    /// Response of the most recent call a `then` step inspects
    pub last_response: Option<ProbeResponse>,

    /// User registered most recently in this scenario
    pub last_user: Option<TestUser>,

    /// Token sent with admin-only calls. Cleared by `no_session`, and
    /// deliberately filled with a non-admin token by `login_non_admin`.
    pub admin_token: Option<SessionToken>,

    /// Token from logging in as `last_user`
    pub user_token: Option<SessionToken>,

    /// Per-service health responses, only for services that answered
    pub health_responses: BTreeMap<String, ProbeResponse>,

    /// Parsed records for `health_responses`
    pub health_records: BTreeMap<String, ServiceHealthRecord>,

    pub global_health: Option<ProbeResponse>,

    /// The monitor's view of each service, parsed from `global_health`.
    /// Kept apart from `health_records`, whose keys overlap.
    pub global_records: BTreeMap<String, ServiceHealthRecord>,

    pub log_backend: Option<ProbeResponse>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, response: ProbeResponse) -> &ProbeResponse {
        self.last_response.insert(response)
    }

    pub fn admin_bearer(&self) -> Option<&str> {
        self.admin_token.as_ref().map(|t| t.token.as_str())
    }

    pub fn clear_health(&mut self) {
        self.health_responses.clear();
        self.health_records.clear();
    }

    pub fn insert_health(&mut self, service: &str, response: ProbeResponse) {
        self.health_records.insert(
            service.to_string(),
            ServiceHealthRecord::from_response(service, &response),
        );
        self.health_responses.insert(service.to_string(), response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Role;
    use crate::health::HealthStatus;

    #[test]
    fn test_fresh_context_is_empty() {
        let ctx = ScenarioContext::new();
        assert!(ctx.last_response.is_none());
        assert!(ctx.last_user.is_none());
        assert!(ctx.admin_bearer().is_none());
        assert!(ctx.health_responses.is_empty());
        assert!(ctx.global_records.is_empty());
    }

    #[test]
    fn test_contexts_do_not_share_state() {
        let mut first = ScenarioContext::new();
        first.admin_token = Some(SessionToken {
            subject: "admin".into(),
            token: "t".into(),
            issued_for: Role::Admin,
        });
        first.record(ProbeResponse::new(200, "{}"));

        let second = ScenarioContext::new();
        assert!(second.admin_token.is_none());
        assert!(second.last_response.is_none());
    }

    #[test]
    fn test_insert_health_builds_record() {
        let mut ctx = ScenarioContext::new();
        ctx.insert_health("notifications", ProbeResponse::new(200, r#"{"status":"UP"}"#));
        assert_eq!(ctx.health_records["notifications"].status, HealthStatus::Up);

        ctx.clear_health();
        assert!(ctx.health_records.is_empty());
        assert!(ctx.health_responses.is_empty());
    }
}
