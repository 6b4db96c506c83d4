use super::{error_from_response, CmsError, CmsResult, EnvConfig};
use crate::models::{ContentBlock, SectionStyleRecord, SectionStyleValue};
use crate::util::now_iso;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};

pub(crate) const CONTENT_BLOCKS_TABLE: &str = "content_blocks";
pub(crate) const SECTION_STYLES_TABLE: &str = "section_styles";

/// Remote row store holding the cross-device copy of every edit.
///
/// Reads return `Ok(None)` when no row exists. There is no versioning: the last
/// upsert to land wins.
pub(crate) trait RemoteStore {
    async fn get_content_block(&self, key: &str) -> CmsResult<Option<ContentBlock>>;
    async fn upsert_content_block(&self, key: &str, html: &str) -> CmsResult<()>;
    async fn get_section_style(&self, id: &str) -> CmsResult<Option<SectionStyleRecord>>;
    async fn upsert_section_style(&self, id: &str, value: &SectionStyleValue) -> CmsResult<()>;
}

/// PostgREST-style client for the `content_blocks` / `section_styles` tables.
///
/// Reads are public and go out with the anon key; writes need the signed-in
/// editor's access token.
#[derive(Clone)]
pub(crate) struct RestStore {
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
    token: Arc<RwLock<Option<String>>>,
}

impl RestStore {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            base_url: config.store_url.clone(),
            anon_key: config.store_anon_key.clone(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Shared across clones, so a sign-in is picked up by every component.
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    pub(crate) fn bearer(&self) -> String {
        let token = self.token.read().ok().and_then(|t| t.clone());
        format!("Bearer {}", token.unwrap_or_else(|| self.anon_key.clone()))
    }

    pub(crate) fn select_url(&self, table: &str, column: &str, value: &str, select: &str) -> String {
        format!(
            "{}/rest/v1/{}?{}=eq.{}&select={}",
            self.base_url,
            table,
            column,
            urlencoding::encode(value),
            select
        )
    }

    pub(crate) fn upsert_url(&self, table: &str, conflict: &str) -> String {
        format!("{}/rest/v1/{}?on_conflict={}", self.base_url, table, conflict)
    }

    fn with_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        select: &str,
    ) -> CmsResult<Option<T>> {
        let client = reqwest::Client::new();
        let req = self.with_headers(client.get(self.select_url(table, column, value, select)));

        let res = req.send().await.map_err(CmsError::network)?;
        if !res.status().is_success() {
            return Err(error_from_response(res, "Read failed").await);
        }

        let rows: Vec<T> = res.json().await.map_err(CmsError::parse)?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_row(
        &self,
        table: &str,
        conflict: &str,
        row: serde_json::Value,
    ) -> CmsResult<()> {
        let client = reqwest::Client::new();
        let req = self
            .with_headers(client.post(self.upsert_url(table, conflict)))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);

        let res = req.send().await.map_err(CmsError::network)?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(res, "Upsert failed").await)
        }
    }
}

impl RemoteStore for RestStore {
    async fn get_content_block(&self, key: &str) -> CmsResult<Option<ContentBlock>> {
        self.select_one(CONTENT_BLOCKS_TABLE, "key", key, "key,html,updated_at")
            .await
    }

    async fn upsert_content_block(&self, key: &str, html: &str) -> CmsResult<()> {
        self.upsert_row(
            CONTENT_BLOCKS_TABLE,
            "key",
            serde_json::json!({ "key": key, "html": html, "updated_at": now_iso() }),
        )
        .await
    }

    async fn get_section_style(&self, id: &str) -> CmsResult<Option<SectionStyleRecord>> {
        self.select_one(SECTION_STYLES_TABLE, "id", id, "id,value,updated_at")
            .await
    }

    async fn upsert_section_style(&self, id: &str, value: &SectionStyleValue) -> CmsResult<()> {
        self.upsert_row(
            SECTION_STYLES_TABLE,
            "id",
            serde_json::json!({ "id": id, "value": value, "updated_at": now_iso() }),
        )
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestStore {
        RestStore::new(&EnvConfig {
            store_url: "https://rows.example.org".to_string(),
            store_anon_key: "anon-key".to_string(),
            api_url: String::new(),
        })
    }

    #[test]
    fn select_url_encodes_key_filter() {
        let s = store();
        assert_eq!(
            s.select_url(CONTENT_BLOCKS_TABLE, "key", "image:home logo", "key,html,updated_at"),
            "https://rows.example.org/rest/v1/content_blocks?key=eq.image%3Ahome%20logo&select=key,html,updated_at"
        );
    }

    #[test]
    fn upsert_url_names_conflict_column() {
        assert_eq!(
            store().upsert_url(SECTION_STYLES_TABLE, "id"),
            "https://rows.example.org/rest/v1/section_styles?on_conflict=id"
        );
    }

    #[test]
    fn bearer_falls_back_to_anon_key_until_signed_in() {
        let s = store();
        assert_eq!(s.bearer(), "Bearer anon-key");

        let shared = s.clone();
        s.set_token(Some("editor-jwt".to_string()));
        assert_eq!(shared.bearer(), "Bearer editor-jwt");

        s.set_token(None);
        assert_eq!(shared.bearer(), "Bearer anon-key");
    }
}
