//! Authorization policy for the admin and cron endpoints.
//!
//! [`authorize`] is a plain function over the presented [`Credentials`] and
//! the configured [`AuthPolicy`]; it never reads the process environment.

use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::error::GatewayError;

/// Configured secrets. An unset secret never matches anything.
#[derive(Clone, Default)]
pub struct AuthPolicy {
    /// Shared bearer secret used by the scheduler.
    pub cron_secret: Option<String>,
    /// Password for manual admin triggers.
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPolicy")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "<redacted>"))
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credentials presented by a caller.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Token from `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    /// Value of the `x-admin-password` header.
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &self.bearer.is_some())
            .field("admin_password", &self.admin_password.is_some())
            .finish()
    }
}

/// Who was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Caller {
    /// Scheduled job holding the cron secret.
    Cron,
    /// Human administrator.
    Admin,
}

impl Caller {
    /// Label stored as `synced_by` / `triggered_by`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Admin => "admin",
        }
    }
}

/// Checks `credentials` against `policy`.
///
/// The bearer token is accepted if it equals the cron secret or the admin
/// password; the admin header only if it equals the admin password.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] if nothing matches.
pub fn authorize(credentials: &Credentials, policy: &AuthPolicy) -> Result<Caller, GatewayError> {
    if let Some(token) = credentials.bearer.as_deref() {
        if matches_secret(token, policy.cron_secret.as_deref()) {
            return Ok(Caller::Cron);
        }
        if matches_secret(token, policy.admin_password.as_deref()) {
            return Ok(Caller::Admin);
        }
    }
    if let Some(password) = credentials.admin_password.as_deref()
        && matches_secret(password, policy.admin_password.as_deref())
    {
        return Ok(Caller::Admin);
    }
    Err(GatewayError::Unauthorized)
}

fn matches_secret(presented: &str, expected: Option<&str>) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => {
            bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
        }
        _ => false,
    }
}
