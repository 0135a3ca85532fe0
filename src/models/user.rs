use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

/// Account role as reported by the backend.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Unknown or missing roles are treated as ordinary customers.
fn role_or_customer<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|value| Role::from_str(value).ok())
        .unwrap_or_default())
}

/// The signed-in account (`GET /api/auth/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "role_or_customer")]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Splits the profile name into first name and the remainder.
    pub fn name_parts(&self) -> (Option<String>, Option<String>) {
        let full_name = match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return (None, None),
        };

        match full_name.split_once(' ') {
            Some((first, rest)) => (Some(first.to_string()), Some(rest.trim().to_string())),
            None => (Some(full_name.to_string()), None),
        }
    }
}

/// Bearer token issued by the login endpoint. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Response of `POST /api/auth/login`.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Body of `POST /api/auth/register`.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please choose a username"))]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[validate(length(min = 1, message = "Please choose a password"))]
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_defaults_to_customer() {
        let user: User = serde_json::from_value(json!({
            "id": 3, "username": "ama", "email": null, "full_name": null, "role": null
        }))
        .unwrap();
        assert_eq!(user.role, Role::Customer);

        let admin: User =
            serde_json::from_value(json!({"id": 1, "username": "root", "role": "ADMIN"})).unwrap();
        assert!(admin.is_admin());
    }

    #[test]
    fn name_parts_split_on_first_space() {
        let user = User {
            id: 1,
            username: "kofi".into(),
            email: None,
            full_name: Some("Kofi Ama Mensah".into()),
            role: Role::Customer,
        };
        assert_eq!(
            user.name_parts(),
            (Some("Kofi".to_string()), Some("Ama Mensah".to_string()))
        );
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("secret-value");
        assert!(!format!("{:?}", token).contains("secret-value"));
    }

    #[test]
    fn register_request_checks_email() {
        let request = RegisterRequest {
            email: "not-an-email".into(),
            username: "ama".into(),
            full_name: None,
            password: "pw".into(),
        };
        assert!(request.validate().is_err());
    }
}
