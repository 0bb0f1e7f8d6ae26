//! Caller identity forwarded by the upstream gateway. Session handling lives
//! there; this module only reads the result and enforces roles.

use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Counselor,
    Student,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Counselor => "counselor",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "counselor" | "counsellor" => Ok(Role::Counselor),
            "student" => Ok(Role::Student),
            _ => Err(AuthError::Unauthenticated),
        }
    }
}

/// Authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = header(headers, USER_ID_HEADER).ok_or(AuthError::Unauthenticated)?;
        let role = header(headers, USER_ROLE_HEADER)
            .ok_or(AuthError::Unauthenticated)?
            .parse()?;
        Ok(Self::new(user_id, role))
    }

    pub fn require(&self, allowed: &[Role]) -> Result<(), AuthError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { role: self.role })
        }
    }

    /// Admins act for anyone; everyone else only for their own id.
    pub fn require_self_or_admin(&self, subject_id: &str) -> Result<(), AuthError> {
        if self.role == Role::Admin || self.user_id == subject_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden { role: self.role })
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role {role} is not allowed to perform this action")]
    Forbidden { role: Role },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(user: Option<&'static str>, role: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(user) = user {
            headers.insert(USER_ID_HEADER, HeaderValue::from_static(user));
        }
        if let Some(role) = role {
            headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(role));
        }
        headers
    }

    #[test]
    fn reads_identity_from_headers() {
        let caller = Caller::from_headers(&headers(Some("cns-1"), Some("Counselor")))
            .expect("valid headers");
        assert_eq!(caller, Caller::new("cns-1", Role::Counselor));
    }

    #[test]
    fn missing_or_unknown_headers_are_unauthenticated() {
        assert_eq!(
            Caller::from_headers(&headers(None, Some("admin"))),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(
            Caller::from_headers(&headers(Some("u-1"), None)),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(
            Caller::from_headers(&headers(Some("u-1"), Some("root"))),
            Err(AuthError::Unauthenticated)
        );
    }

    #[test]
    fn role_checks_map_to_forbidden() {
        let student = Caller::new("stu-1", Role::Student);
        assert_eq!(
            student.require(&[Role::Admin, Role::Counselor]),
            Err(AuthError::Forbidden {
                role: Role::Student
            })
        );
        assert!(student.require_self_or_admin("stu-1").is_ok());
        assert!(student.require_self_or_admin("stu-2").is_err());
        assert!(Caller::new("adm", Role::Admin)
            .require_self_or_admin("stu-2")
            .is_ok());
    }

    #[test]
    fn rejections_use_auth_status_codes() {
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Forbidden { role: Role::Student }
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }
}
