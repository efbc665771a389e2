//! Step glue: binds each [`StepAction`] to probe calls and assertions

use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::assertions::{
    assert_body_not_blank, assert_field_present, assert_global_health, assert_health_shape,
    assert_json, assert_schema, assert_service_status_enum, assert_status, assert_status_in,
    AssertionError,
};
use crate::config::{HarnessConfig, LogSettle};
use crate::context::ScenarioContext;
use crate::error::{StepError, StepResult};
use crate::fixtures::{FixtureGenerator, Role, TestUser};
use crate::health::{
    records_from_global, service_kind, HealthStatus, MonitoredService, ServiceKind,
};
use crate::probe::{ProbeClient, ProbeResponse};
use crate::schema::SchemaRegistry;
use crate::session::{token_from_response, SessionManager};
use crate::spec::StepAction;

/// Username that the auth service never holds
pub const MISSING_USERNAME: &str = "usuario_inexistente_12345";

const ACTUATOR_HEALTH: &str = "/actuator/health";

/// Shared, read-only collaborators for executing steps
pub struct Steps<'a> {
    probe: &'a ProbeClient,
    schemas: &'a SchemaRegistry,
    config: &'a HarnessConfig,
}

impl<'a> Steps<'a> {
    pub fn new(
        probe: &'a ProbeClient,
        schemas: &'a SchemaRegistry,
        config: &'a HarnessConfig,
    ) -> Self {
        Self {
            probe,
            schemas,
            config,
        }
    }

    fn sessions(&self) -> SessionManager<'_> {
        SessionManager::new(self.probe, &self.config.admin, self.config.admin_provisioning)
    }

    pub async fn execute(&self, action: &StepAction, ctx: &mut ScenarioContext) -> StepResult {
        match action {
            StepAction::ServiceAvailable => Ok(()),
            StepAction::RegisterUser => self.register_user(ctx).await,
            StepAction::RegisteredUserExists => {
                self.register_user(ctx).await?;
                assert_status_in(last_response(ctx)?, &[200, 201])?;
                Ok(())
            }
            StepAction::LoginCorrect => self.login_correct(ctx).await,
            StepAction::ExpectToken => match &ctx.user_token {
                Some(token) if !token.token.trim().is_empty() => Ok(()),
                _ => Err(StepError::fail("expected a non-blank JWT token after login")),
            },
            StepAction::RequestRecoveryCode => {
                let username = last_user(ctx)?.username.clone();
                let response = self.probe.request_recovery_code(&username).await?;
                ctx.record(response);
                Ok(())
            }
            StepAction::LoginAdmin => {
                let token = self.sessions().login_as_admin().await?;
                ctx.admin_token = Some(token);
                Ok(())
            }
            StepAction::ListUsers { page } => {
                let response = self.probe.list_users(ctx.admin_bearer(), *page).await?;
                ctx.record(response);
                Ok(())
            }
            StepAction::ExpectUserList => {
                assert_field_present(last_response(ctx)?, "/respuesta")?;
                Ok(())
            }
            StepAction::DeleteLastUser => {
                let username = last_user(ctx)?.username.clone();
                let response = self.probe.delete_user(ctx.admin_bearer(), &username).await?;
                ctx.record(response);
                Ok(())
            }
            StepAction::DeleteMissingUser => {
                let response = self
                    .probe
                    .delete_user(ctx.admin_bearer(), MISSING_USERNAME)
                    .await?;
                ctx.record(response);
                Ok(())
            }
            StepAction::NoSession => {
                ctx.admin_token = None;
                Ok(())
            }
            StepAction::LoginNonAdmin => {
                let user = last_user(ctx)?.clone();
                let token = self
                    .sessions()
                    .login(&user.username, &user.password, Role::User)
                    .await?;
                ctx.admin_token = Some(token);
                Ok(())
            }

            StepAction::ExpectStatus { code } => {
                assert_status(last_response(ctx)?, *code)?;
                Ok(())
            }
            StepAction::ExpectStatusIn { codes } => {
                assert_status_in(last_response(ctx)?, codes)?;
                Ok(())
            }
            StepAction::ExpectBodyNotBlank => {
                assert_body_not_blank(last_response(ctx)?)?;
                Ok(())
            }
            StepAction::ExpectSchema { schema } => {
                assert_schema(self.schemas, &last_response(ctx)?.body, schema)?;
                Ok(())
            }
            StepAction::ExpectField { pointer } => {
                assert_field_present(last_response(ctx)?, pointer)?;
                Ok(())
            }

            StepAction::SystemDeployed => {
                let gateway = &self.probe.endpoints().gateway;
                let response = self.probe.health(gateway, ACTUATOR_HEALTH).await?;
                // A gateway reporting 503 is deployed, just degraded
                assert_status_in(&response, &[200, 503])?;
                Ok(())
            }
            StepAction::QueryAllHealth => {
                self.query_all_health(ctx).await;
                Ok(())
            }
            StepAction::ExpectAllServicesStatus { status } => {
                expect_all_services_status(ctx, status)
            }
            StepAction::ExpectHealthShape => expect_health_shape(ctx),
            StepAction::ExpectHealthInfo => {
                if ctx.health_responses.is_empty() {
                    self.query_all_health(ctx).await;
                }
                expect_health_info(ctx)
            }
            StepAction::MonitorAvailable => {
                let response = self.probe.global_health().await?;
                assert_status(&response, 200)?;
                Ok(())
            }
            StepAction::QueryGlobalHealth => {
                ctx.global_health = Some(self.probe.global_health().await?);
                Ok(())
            }
            StepAction::ExpectServicesListed => {
                let body = monitor_object(global_health(ctx)?)?;
                ctx.global_records = records_from_global(&body);
                debug!("Monitor lists {} service(s)", ctx.global_records.len());
                Ok(())
            }
            StepAction::ExpectServiceStatusEnum => {
                let body = monitor_object(global_health(ctx)?)?;
                assert_global_health(&body)?;
                Ok(())
            }
            StepAction::ExpectMonitorReportsUp => {
                if ctx.global_health.is_none() {
                    ctx.global_health = Some(self.probe.global_health().await?);
                }
                expect_monitor_reports_up(ctx)
            }
            StepAction::GenerateLog => {
                let notifications = &self.probe.endpoints().notifications;
                self.probe.health(notifications, "/health").await?;
                self.settle_logs().await;
                Ok(())
            }
            StepAction::QueryLogBackend => {
                ctx.log_backend = match self.probe.log_backend_ready().await {
                    Ok(response) => Some(response),
                    Err(e) => {
                        warn!("Log backend not available: {}", e);
                        None
                    }
                };
                Ok(())
            }
            StepAction::ExpectLogFound => match &ctx.log_backend {
                Some(response) => {
                    assert_status(response, 200)?;
                    Ok(())
                }
                None => Err(StepError::skip(format!(
                    "log backend not available at {}",
                    self.probe.endpoints().log_backend
                ))),
            },
            StepAction::ExpectLogsCentralized => {
                if ctx.log_backend.is_none() {
                    ctx.log_backend = Some(self.probe.log_backend_ready().await?);
                }
                match &ctx.log_backend {
                    Some(response) => {
                        assert_status(response, 200)?;
                        Ok(())
                    }
                    None => Err(StepError::fail("log backend response missing")),
                }
            }
            StepAction::MonitorRegistered => {
                let response = self.probe.global_health().await?;
                assert_status(&response, 200)?;
                ctx.global_health = Some(response);
                Ok(())
            }
            StepAction::ServiceStopsResponding => {
                debug!("Service outage is simulated outside the harness");
                Ok(())
            }
            StepAction::ExpectFailureDetected | StepAction::ExpectNotificationSent => {
                monitor_object(global_health(ctx)?)?;
                Ok(())
            }
            StepAction::UserRegistersViaGateway => {
                let user = FixtureGenerator::new().new_user();
                let response = self.probe.register_via_gateway(&user).await?;
                ctx.last_user = Some(user);
                ctx.record(response);
                Ok(())
            }
            StepAction::UserPerformsOperations => {
                let gateway = &self.probe.endpoints().gateway;
                if let Err(e) = self.probe.health(gateway, ACTUATOR_HEALTH).await {
                    debug!("Gateway operation failed, continuing: {}", e);
                }
                Ok(())
            }

            StepAction::Log { message } => {
                info!("{}", message);
                Ok(())
            }
        }
    }

    async fn register_user(&self, ctx: &mut ScenarioContext) -> StepResult {
        let user = FixtureGenerator::new().new_user();
        let response = self.probe.register(&user).await?;
        debug!("Registered {} -> {}", user.username, response.status);
        ctx.last_user = Some(user);
        ctx.record(response);
        Ok(())
    }

    async fn login_correct(&self, ctx: &mut ScenarioContext) -> StepResult {
        let user: TestUser = last_user(ctx)?.clone();
        let response = self.probe.login(&user.username, &user.password).await?;
        // A failed login must not leave an older token behind
        ctx.user_token = token_from_response(&response, &user.username, Role::User).ok();
        ctx.record(response);
        Ok(())
    }

    /// Probe every application service; unreachable ones are left out
    async fn query_all_health(&self, ctx: &mut ScenarioContext) {
        ctx.clear_health();
        for service in MonitoredService::all(self.probe.endpoints()) {
            match self.probe.health(&service.base_uri, service.path).await {
                Ok(response) => ctx.insert_health(service.name, response),
                Err(e) => debug!("{} not available: {}", service.name, e),
            }
        }
    }

    async fn settle_logs(&self) {
        match self.config.log_settle {
            LogSettle::FixedDelay { delay_ms } => {
                sleep(Duration::from_millis(delay_ms)).await;
            }
            LogSettle::Poll {
                interval_ms,
                timeout_ms,
            } => {
                // The budget covers in-flight requests, not just the gaps between them
                let poll = async {
                    loop {
                        match self.probe.log_backend_ready().await {
                            Ok(response) if response.status == 200 => return,
                            _ => sleep(Duration::from_millis(interval_ms)).await,
                        }
                    }
                };
                if timeout(Duration::from_millis(timeout_ms), poll).await.is_err() {
                    warn!("Log backend not ready after {} ms", timeout_ms);
                }
            }
        }
    }
}

fn last_response(ctx: &ScenarioContext) -> Result<&ProbeResponse, StepError> {
    ctx.last_response
        .as_ref()
        .ok_or_else(|| StepError::fail("no response recorded by an earlier step"))
}

fn last_user(ctx: &ScenarioContext) -> Result<&TestUser, StepError> {
    ctx.last_user
        .as_ref()
        .ok_or_else(|| StepError::fail("no user registered by an earlier step"))
}

fn global_health(ctx: &ScenarioContext) -> Result<&ProbeResponse, StepError> {
    ctx.global_health
        .as_ref()
        .ok_or_else(|| StepError::fail("monitoring system response missing"))
}

fn no_services_available() -> StepError {
    StepError::skip(concat!(
        "no microservice is available; ",
        "expected when the services are not running in this environment"
    ))
}

/// 200, non-blank, and a JSON object
fn monitor_object(response: &ProbeResponse) -> Result<Value, StepError> {
    assert_status(response, 200)?;
    assert_body_not_blank(response)?;
    let body = assert_json(response, "monitor response")?;
    if !body.is_object() {
        return Err(AssertionError::InvalidJson {
            context: "monitor response".to_string(),
            excerpt: response.excerpt().to_string(),
        }
        .into());
    }
    Ok(body)
}

fn expect_all_services_status(ctx: &ScenarioContext, expected: &str) -> StepResult {
    if ctx.health_responses.is_empty() {
        return Err(no_services_available());
    }

    for (name, response) in &ctx.health_responses {
        if expected == HealthStatus::Up.as_str() {
            // Framework endpoints can answer 200 while reporting DOWN in the body
            if service_kind(name) == ServiceKind::Framework && response.status == 200 {
                let reported = ctx
                    .health_records
                    .get(name)
                    .filter(|record| record.status != HealthStatus::Up)
                    .and_then(|record| record.reported_status());
                if let Some(reported) = reported {
                    return Err(StepError::fail(format!(
                        "service {name} answered HTTP 200 but reports status '{reported}' \
                         instead of 'UP'"
                    )));
                }
            }
            assert_status(response, 200).map_err(|e| {
                StepError::fail(format!("service {name} must answer 200 (UP): {e}"))
            })?;
        } else if !(200..500).contains(&response.status) {
            return Err(StepError::fail(format!(
                "service {name} must answer with a valid code (got {})",
                response.status
            )));
        }

        if response.is_blank() {
            return Err(StepError::fail(format!(
                "health response body of {name} must not be blank"
            )));
        }
    }
    Ok(())
}

fn expect_health_shape(ctx: &ScenarioContext) -> StepResult {
    if ctx.health_responses.is_empty() {
        return Err(no_services_available());
    }

    for (name, response) in ctx.health_responses.iter().filter(|(_, r)| r.status == 200) {
        let body = assert_json(response, &format!("health response of {name}"))?;
        assert_health_shape(name, &body, service_kind(name))?;
    }
    Ok(())
}

fn expect_health_info(ctx: &ScenarioContext) -> StepResult {
    if ctx.health_responses.is_empty() {
        return Err(StepError::fail(
            "at least one health check response is required",
        ));
    }

    for (name, response) in &ctx.health_responses {
        assert_status(response, 200)
            .map_err(|e| StepError::fail(format!("service {name}: {e}")))?;
        let body = assert_json(response, &format!("health check of {name}"))?;
        let informative = body
            .as_object()
            .map(|o| !o.is_empty() && (o.contains_key("status") || o.contains_key("components")))
            .unwrap_or(false);
        if !informative {
            return Err(AssertionError::HealthShape {
                service: name.clone(),
                reason: "must include 'status' or 'components'".to_string(),
                excerpt: response.excerpt().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Validates every reported status, then keeps the monitor's view as records
fn expect_monitor_reports_up(ctx: &mut ScenarioContext) -> StepResult {
    let body = monitor_object(global_health(ctx)?)?;
    let Some(services) = body.as_object().filter(|s| !s.is_empty()) else {
        ctx.global_records.clear();
        return Ok(());
    };

    for (name, entry) in services {
        if let Some(service) = entry.as_object() {
            assert_service_status_enum(service.get("status"))
                .map_err(|e| StepError::fail(format!("service {name}: {e}")))?;
        }
    }

    ctx.global_records = records_from_global(&body);
    if ctx.global_records.is_empty() {
        return Err(StepError::fail(
            "monitoring system must report the status of at least one service",
        ));
    }
    if !ctx.global_records.values().any(|r| r.status == HealthStatus::Up) {
        return Err(StepError::fail(
            "at least one service must be UP for the system to be operational",
        ));
    }
    Ok(())
}
