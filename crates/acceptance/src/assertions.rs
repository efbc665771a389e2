//! Response assertions
//!
//! Each check either passes or returns an [`AssertionError`] that carries a
//! bounded excerpt of the raw body.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::health::{HealthStatus, ServiceKind};
use crate::probe::{excerpt, ProbeResponse};
use crate::schema::SchemaRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    #[error("expected status {expected} but got {actual}; body: {excerpt}")]
    UnexpectedStatus {
        expected: String,
        actual: u16,
        excerpt: String,
    },

    #[error("response body must not be blank")]
    BlankBody,

    #[error("{context} must be valid JSON; body: {excerpt}")]
    InvalidJson { context: String, excerpt: String },

    #[error("missing field '{field}'; body: {excerpt}")]
    MissingField { field: String, excerpt: String },

    #[error("body does not match schema '{schema}': {}; body: {excerpt}", .violations.join("; "))]
    SchemaViolation {
        schema: String,
        violations: Vec<String>,
        excerpt: String,
    },

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("{service} health payload invalid: {reason}; body: {excerpt}")]
    HealthShape {
        service: String,
        reason: String,
        excerpt: String,
    },

    #[error("status must be one of UP, DOWN, UNKNOWN (got: {value})")]
    InvalidStatusEnum { value: String },
}

pub type AssertionResult<T = ()> = Result<T, AssertionError>;

pub fn assert_status(response: &ProbeResponse, expected: u16) -> AssertionResult {
    assert_status_in(response, &[expected])
}

pub fn assert_status_in(response: &ProbeResponse, expected: &[u16]) -> AssertionResult {
    if expected.contains(&response.status) {
        return Ok(());
    }
    let expected = expected
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(AssertionError::UnexpectedStatus {
        expected,
        actual: response.status,
        excerpt: response.excerpt().to_string(),
    })
}

pub fn assert_body_not_blank(response: &ProbeResponse) -> AssertionResult {
    if response.is_blank() {
        Err(AssertionError::BlankBody)
    } else {
        Ok(())
    }
}

/// Parse the body as JSON
pub fn assert_json(response: &ProbeResponse, context: &str) -> AssertionResult<Value> {
    response.json().ok_or_else(|| AssertionError::InvalidJson {
        context: context.to_string(),
        excerpt: response.excerpt().to_string(),
    })
}

/// Field at JSON pointer `pointer` exists and is not null
pub fn assert_field_present(response: &ProbeResponse, pointer: &str) -> AssertionResult {
    let body = assert_json(response, "response body")?;
    match body.pointer(pointer) {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(AssertionError::MissingField {
            field: pointer.trim_start_matches('/').replace('/', "."),
            excerpt: response.excerpt().to_string(),
        }),
    }
}

pub fn assert_schema(registry: &SchemaRegistry, body: &str, schema_id: &str) -> AssertionResult {
    let instance: Value = serde_json::from_str(body).map_err(|_| AssertionError::InvalidJson {
        context: format!("body checked against '{schema_id}'"),
        excerpt: excerpt(body).to_string(),
    })?;

    let violations = registry
        .violations(schema_id, &instance)
        .map_err(|_| AssertionError::UnknownSchema(schema_id.to_string()))?;

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AssertionError::SchemaViolation {
            schema: schema_id.to_string(),
            violations,
            excerpt: excerpt(body).to_string(),
        })
    }
}

/// Accepts the component-based shape for framework services and the custom
/// shape for everything else
pub fn assert_health_shape(service: &str, body: &Value, kind: ServiceKind) -> AssertionResult {
    let shape_error = |reason: &str| AssertionError::HealthShape {
        service: service.to_string(),
        reason: reason.to_string(),
        excerpt: excerpt(&body.to_string()).to_string(),
    };

    let object = body
        .as_object()
        .ok_or_else(|| shape_error("expected a JSON object"))?;

    match kind {
        ServiceKind::Framework => {
            if object.contains_key("status") || object.contains_key("components") {
                Ok(())
            } else {
                Err(shape_error("must include 'status' or 'components'"))
            }
        }
        ServiceKind::Custom => {
            if !object.contains_key("status") {
                return Err(shape_error("must include 'status'"));
            }
            let version_and_uptime =
                object.contains_key("version") && object.contains_key("uptime");
            if version_and_uptime || has_checks(object) {
                Ok(())
            } else {
                Err(shape_error("must include (version and uptime) or checks"))
            }
        }
    }
}

fn has_checks(object: &Map<String, Value>) -> bool {
    match object.get("checks") {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// `value` must be exactly "UP", "DOWN" or "UNKNOWN"
pub fn assert_service_status_enum(value: Option<&Value>) -> AssertionResult<HealthStatus> {
    match value {
        Some(Value::String(s)) => {
            HealthStatus::parse(s).ok_or_else(|| AssertionError::InvalidStatusEnum {
                value: format!("{s:?}"),
            })
        }
        Some(other) => Err(AssertionError::InvalidStatusEnum {
            value: other.to_string(),
        }),
        None => Err(AssertionError::InvalidStatusEnum {
            value: "missing".to_string(),
        }),
    }
}

/// Aggregator body: an object mapping service name to `{status, ...}`.
/// An empty object is valid.
pub fn assert_global_health(body: &Value) -> AssertionResult<Vec<(String, HealthStatus)>> {
    let services = body.as_object().ok_or_else(|| AssertionError::InvalidJson {
        context: "monitor response".to_string(),
        excerpt: excerpt(&body.to_string()).to_string(),
    })?;

    let mut statuses = Vec::with_capacity(services.len());
    for (name, entry) in services {
        let service = entry
            .as_object()
            .ok_or_else(|| AssertionError::HealthShape {
                service: name.clone(),
                reason: "must be a JSON object with status information".to_string(),
                excerpt: excerpt(&entry.to_string()).to_string(),
            })?;
        let status = assert_service_status_enum(service.get("status")).map_err(|e| {
            AssertionError::HealthShape {
                service: name.clone(),
                reason: e.to_string(),
                excerpt: excerpt(&entry.to_string()).to_string(),
            }
        })?;
        statuses.push((name.clone(), status));
    }
    Ok(statuses)
}
