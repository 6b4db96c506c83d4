pub(crate) mod auth;
pub(crate) mod rest;
pub(crate) mod site;

pub(crate) use auth::AuthClient;
pub(crate) use rest::{RemoteStore, RestStore};
pub(crate) use site::{FallbackWriter, SiteApi};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub(crate) enum CmsErrorKind {
    /// Rejected client-side before any I/O.
    Validation,
    Unauthorized,
    Network,
    Http,
    Parse,
    /// Browser-local storage unavailable or full.
    Storage,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct CmsError {
    pub kind: CmsErrorKind,
    pub message: String,
}

impl CmsError {
    pub(crate) fn new(kind: CmsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn network(e: reqwest::Error) -> Self {
        Self::new(CmsErrorKind::Network, e.to_string())
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self::new(CmsErrorKind::Parse, e.to_string())
    }

    pub(crate) fn unauthorized() -> Self {
        Self::new(CmsErrorKind::Unauthorized, "Unauthorized")
    }

    pub(crate) fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self::new(CmsErrorKind::Http, format!("{ctx} ({status}): {body}"))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(CmsErrorKind::Validation, message)
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::new(CmsErrorKind::Storage, message)
    }
}

pub(crate) type CmsResult<T> = Result<T, CmsError>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    /// Remote row store origin (REST and auth endpoints live below it).
    pub store_url: String,
    /// Public key sent as `apikey` on every row store request.
    pub store_anon_key: String,
    /// Site server origin for `/api/*`; empty means same origin.
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let mut cfg = Self::defaults();

        // We support BOTH `window.ENV.STORE_URL` and `window.ENV.store_url` style keys.
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    let read = |upper: &str, lower: &str| -> Option<String> {
                        [upper, lower].into_iter().find_map(|k| {
                            js_sys::Reflect::get(&env, &k.into())
                                .ok()
                                .and_then(|v| v.as_string())
                        })
                    };

                    if let Some(v) = read("STORE_URL", "store_url") {
                        cfg.store_url = v;
                    }
                    if let Some(v) = read("STORE_ANON_KEY", "store_anon_key") {
                        cfg.store_anon_key = v;
                    }
                    if let Some(v) = read("API_URL", "api_url") {
                        cfg.api_url = v;
                    }
                }
            }
        }

        cfg.normalized()
    }

    pub fn defaults() -> Self {
        Self {
            store_url: "http://localhost:54321".to_string(),
            store_anon_key: String::new(),
            api_url: String::new(),
        }
    }

    /// Trailing slashes are dropped so paths can be appended with `format!`.
    pub fn normalized(mut self) -> Self {
        self.store_url = self.store_url.trim().trim_end_matches('/').to_string();
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        self
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a non-2xx response into an error, reading `{error}` / `{message}` bodies when present.
pub(crate) async fn error_from_response(res: reqwest::Response, ctx: &str) -> CmsError {
    let status = res.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return CmsError::unauthorized();
    }
    let body = res.text().await.unwrap_or_default();
    CmsError::http(status, server_error_message(&body), ctx)
}

pub(crate) fn server_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message", "msg", "error_description"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(|s| s.to_string()))
        })
        .unwrap_or_else(|| body.to_string())
}
