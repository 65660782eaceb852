//! Request extractors shared by the handlers.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::auth::authorize;
use crate::domain::{Caller, Credentials};
use crate::error::GatewayError;
use crate::persistence::ClientInfo;

/// Header carrying the admin password for manual triggers.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Extracts [`Credentials`] from the request headers.
#[must_use]
pub fn credentials_from_headers(headers: &HeaderMap) -> Credentials {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    Credentials {
        bearer: header(AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string()),
        admin_password: header(ADMIN_PASSWORD_HEADER).map(str::to_string),
    }
}

/// Proof that the caller presented the cron secret or the admin password.
///
/// Rejects with `401` before the handler body runs.
#[derive(Debug, Clone, Copy)]
pub struct Authorized(pub Caller);

impl FromRequestParts<AppState> for Authorized {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = credentials_from_headers(&parts.headers);
        match authorize(&credentials, &state.auth) {
            Ok(caller) => Ok(Self(caller)),
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), "rejected unauthorized request");
                Err(e)
            }
        }
    }
}

/// Client address and user agent as reported by the proxy headers.
#[derive(Debug, Clone, Default)]
pub struct ClientHeaders {
    /// First `x-forwarded-for` entry, or `x-real-ip`.
    pub ip_address: Option<String>,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
}

impl ClientHeaders {
    /// Reads the client headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let ip_address = text("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .or_else(|| text("x-real-ip"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Self {
            ip_address,
            user_agent: text(USER_AGENT.as_str()).map(str::to_string),
        }
    }

    /// Borrowed view for the persistence layer.
    #[must_use]
    pub fn as_client_info(&self) -> ClientInfo<'_> {
        ClientInfo {
            ip_address: self.ip_address.as_deref(),
            user_agent: self.user_agent.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_and_admin_header_are_read() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  s3cret "));
        headers.insert(ADMIN_PASSWORD_HEADER, HeaderValue::from_static("pw"));
        let creds = credentials_from_headers(&headers);
        assert_eq!(creds.bearer.as_deref(), Some("s3cret"));
        assert_eq!(creds.admin_password.as_deref(), Some("pw"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(credentials_from_headers(&headers).bearer.is_none());
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Safari"));
        let client = ClientHeaders::from_headers(&headers);
        assert_eq!(client.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(client.as_client_info().user_agent, Some("Safari"));
    }
}
