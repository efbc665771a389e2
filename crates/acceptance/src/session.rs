//! Login calls and bearer token extraction

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{AdminCredentials, AdminProvisioning};
use crate::fixtures::{FixtureGenerator, Role};
use crate::probe::{ProbeClient, ProbeError, ProbeResponse};

/// Where a login response may carry its token, tried in order
pub const TOKEN_POINTERS: &[&str] = &["/respuesta/token", "/token"];

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("login rejected with status {status}: {excerpt}")]
    InvalidCredentials { status: u16, excerpt: String },

    #[error("login succeeded but no token at {pointers:?}: {excerpt}")]
    MalformedResponse {
        pointers: Vec<&'static str>,
        excerpt: String,
    },

    #[error(transparent)]
    Unreachable(#[from] ProbeError),
}

/// Bearer token held for the rest of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub subject: String,
    pub token: String,
    pub issued_for: Role,
}

/// First non-blank string found by walking [`TOKEN_POINTERS`]
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_POINTERS.iter().find_map(|pointer| {
        body.pointer(pointer)
            .and_then(Value::as_str)
            .filter(|token| !token.trim().is_empty())
            .map(str::to_string)
    })
}

/// Turn a login response into a token
pub fn token_from_response(
    response: &ProbeResponse,
    subject: &str,
    role: Role,
) -> Result<SessionToken, AuthError> {
    if response.status != 200 {
        return Err(AuthError::InvalidCredentials {
            status: response.status,
            excerpt: response.excerpt().to_string(),
        });
    }

    let token = response
        .json()
        .as_ref()
        .and_then(extract_token)
        .ok_or_else(|| AuthError::MalformedResponse {
            pointers: TOKEN_POINTERS.to_vec(),
            excerpt: response.excerpt().to_string(),
        })?;

    Ok(SessionToken {
        subject: subject.to_string(),
        token,
        issued_for: role,
    })
}

pub struct SessionManager<'a> {
    probe: &'a ProbeClient,
    admin: &'a AdminCredentials,
    provisioning: AdminProvisioning,
}

impl<'a> SessionManager<'a> {
    pub fn new(
        probe: &'a ProbeClient,
        admin: &'a AdminCredentials,
        provisioning: AdminProvisioning,
    ) -> Self {
        Self {
            probe,
            admin,
            provisioning,
        }
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<SessionToken, AuthError> {
        let response = self.probe.login(username, password).await?;
        let token = token_from_response(&response, username, role)?;
        debug!("Logged in as {}", username);
        Ok(token)
    }

    pub async fn login_as_admin(&self) -> Result<SessionToken, AuthError> {
        let first = self
            .login(&self.admin.username, &self.admin.password, Role::Admin)
            .await;

        match (first, self.provisioning) {
            (
                Err(AuthError::InvalidCredentials { status, .. }),
                AdminProvisioning::LazyRegister,
            ) => {
                info!(
                    "Admin login returned {}; registering '{}' and retrying",
                    status, self.admin.username
                );
                let admin = FixtureGenerator::new().admin(self.admin);
                let registered = self.probe.register(&admin).await?;
                if !(200..300).contains(&registered.status) {
                    warn!(
                        "Admin registration returned {}: {}",
                        registered.status,
                        registered.excerpt()
                    );
                }
                self.login(&self.admin.username, &self.admin.password, Role::Admin)
                    .await
            }
            (result, _) => result,
        }
    }
}
