use super::{error_from_response, CmsError, CmsResult, EnvConfig};
use crate::models::Session;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct PasswordRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct AuthUser {
    #[serde(default)]
    pub email: Option<String>,
}

/// Token grant returned by the row store's auth service.
///
/// Sign-up returns the same shape when email confirmation is off, and only a
/// user object when it is on.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

const DEFAULT_EXPIRES_IN_S: i64 = 3600;

impl TokenResponse {
    pub(crate) fn into_session(self, fallback_email: &str, now_ms: i64) -> Option<Session> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let email = self
            .user
            .and_then(|u| u.email)
            .unwrap_or_else(|| fallback_email.to_string());
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_S).max(0);
        Some(Session {
            email,
            access_token,
            expires_at_ms: now_ms + expires_in * 1000,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct AuthClient {
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
}

impl AuthClient {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            base_url: config.store_url.clone(),
            anon_key: config.store_anon_key.clone(),
        }
    }

    async fn post_password(&self, path: &str, email: &str, password: &str) -> CmsResult<TokenResponse> {
        let client = reqwest::Client::new();
        let res = client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(&PasswordRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(CmsError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(CmsError::parse)
        } else {
            Err(error_from_response(res, "Authentication failed").await)
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str, now_ms: i64) -> CmsResult<Session> {
        self.post_password("/auth/v1/token?grant_type=password", email, password)
            .await?
            .into_session(email, now_ms)
            .ok_or_else(|| CmsError::parse("Sign-in response is missing access_token"))
    }

    /// `Ok(None)` means the account exists but must be confirmed before signing in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        now_ms: i64,
    ) -> CmsResult<Option<Session>> {
        Ok(self
            .post_password("/auth/v1/signup", email, password)
            .await?
            .into_session(email, now_ms))
    }
}

/// Client-side checks run before any sign-up request.
pub(crate) fn validate_signup(email: &str, password: &str, confirm: &str) -> CmsResult<()> {
    if !email.contains('@') {
        return Err(CmsError::validation("Enter a valid email address"));
    }
    if password != confirm {
        return Err(CmsError::validation("Passwords do not match"));
    }
    if password.len() < 8 {
        return Err(CmsError::validation("Password must be at least 8 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_contract_deserialize() {
        let json = r#"{
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": {"id": "u1", "email": "editor@example.org"}
        }"#;
        let parsed: TokenResponse = serde_json::from_str(json).expect("token response should parse");
        let session = parsed.into_session("typed@example.org", 1_000).expect("session");
        assert_eq!(session.access_token, "jwt-token");
        assert_eq!(session.email, "editor@example.org");
        assert_eq!(session.expires_at_ms, 1_000 + 3_600_000);
    }

    #[test]
    fn signup_awaiting_confirmation_has_no_session() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"user": {"id": "u1", "email": "new@example.org"}}"#).unwrap();
        assert!(parsed.into_session("new@example.org", 0).is_none());
    }

    #[test]
    fn password_request_serialization() {
        let v = serde_json::to_value(PasswordRequest {
            email: "editor@example.org".to_string(),
            password: "secret-pass".to_string(),
        })
        .expect("should serialize");
        assert_eq!(v["email"], "editor@example.org");
        assert_eq!(v["password"], "secret-pass");
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup("a@b.org", "longenough", "longenough").is_ok());
        assert_eq!(
            validate_signup("a@b.org", "longenough", "different").unwrap_err().to_string(),
            "Passwords do not match"
        );
        assert!(validate_signup("a@b.org", "short", "short").is_err());
        assert!(validate_signup("nobody", "longenough", "longenough").is_err());
    }
}
