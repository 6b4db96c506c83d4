use super::{error_from_response, CmsError, CmsResult, EnvConfig};
use serde::{Deserialize, Serialize};

pub(crate) const UPLOAD_PATH: &str = "/api/upload/logo";
pub(crate) const CMS_UPSERT_PATH: &str = "/api/cms/upsert";

/// Second write path for content blocks, used when the direct row store write is
/// rejected. The server performs the same upsert with its own credentials.
pub(crate) trait FallbackWriter {
    async fn upsert_via_server(&self, key: &str, html: &str) -> CmsResult<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CmsUpsertRequest {
    pub key: String,
    pub html: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    pub(crate) fn into_url(self) -> CmsResult<String> {
        match self.url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(url),
            None => Err(CmsError::parse(
                self.error
                    .unwrap_or_else(|| "Upload response is missing url".to_string()),
            )),
        }
    }
}

/// Client for the site's own server endpoints.
#[derive(Clone, Debug)]
pub(crate) struct SiteApi {
    pub(crate) api_url: String,
}

impl SiteApi {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Upload an image as multipart field `file`; returns its persistent URL.
    pub async fn upload_image(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> CmsResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(CmsError::network)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let client = reqwest::Client::new();
        let res = client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(CmsError::network)?;

        if !res.status().is_success() {
            return Err(error_from_response(res, "Upload failed").await);
        }

        let body: UploadResponse = res.json().await.map_err(CmsError::parse)?;
        body.into_url()
    }
}

impl FallbackWriter for SiteApi {
    async fn upsert_via_server(&self, key: &str, html: &str) -> CmsResult<()> {
        let client = reqwest::Client::new();
        let res = client
            .post(self.url(CMS_UPSERT_PATH))
            .json(&CmsUpsertRequest {
                key: key.to_string(),
                html: html.to_string(),
            })
            .send()
            .await
            .map_err(CmsError::network)?;

        if res.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(res, "Server upsert failed").await)
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use crate::api::CmsErrorKind;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Records every fallback call; fails when `fail` is set.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryFallback {
        pub calls: Rc<RefCell<Vec<CmsUpsertRequest>>>,
        pub fail: Rc<Cell<bool>>,
    }

    impl FallbackWriter for MemoryFallback {
        async fn upsert_via_server(&self, key: &str, html: &str) -> CmsResult<()> {
            self.calls.borrow_mut().push(CmsUpsertRequest {
                key: key.to_string(),
                html: html.to_string(),
            });
            if self.fail.get() {
                Err(CmsError::new(CmsErrorKind::Http, "Server upsert failed (500)"))
            } else {
                Ok(())
            }
        }
    }
}
