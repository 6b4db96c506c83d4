pub(crate) mod sink;

pub(crate) use sink::{SaveStatus, Sink, WriteReport};

use crate::api::{FallbackWriter, RemoteStore, RestStore, SiteApi};
use crate::html::sanitize_html;
use crate::models::SectionStyleValue;
use crate::storage::{
    clear_local_content, image_key, load_json, remote_image_key, save_json, style_key, text_key,
    BrowserStorage, KvStore,
};

/// Which layer produced the value rendered on mount. A remote row arrives later
/// through `fetch_*` and replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContentSource {
    Default,
    Local,
}

/// Local cache, remote row store and server fallback composed into one store.
///
/// Display rule: remote row if the fetch succeeded and returned one, else the
/// local cache, else the component default. Remote errors are logged and never
/// reach the caller.
#[derive(Clone)]
pub(crate) struct ContentStore<S, R, F> {
    local: S,
    remote: R,
    fallback: F,
}

pub(crate) type SiteStore = ContentStore<BrowserStorage, RestStore, SiteApi>;

impl<S: KvStore, R: RemoteStore, F: FallbackWriter> ContentStore<S, R, F> {
    pub fn new(local: S, remote: R, fallback: F) -> Self {
        Self {
            local,
            remote,
            fallback,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    // ---- text blocks -------------------------------------------------------

    pub fn cached_text(&self, id: &str) -> Option<String> {
        self.local.get_item(&text_key(id)).map(|h| sanitize_html(&h))
    }

    /// First value to render, available synchronously on mount.
    pub fn initial_text(&self, id: &str, default: &str) -> (String, ContentSource) {
        match self.cached_text(id) {
            Some(html) => (html, ContentSource::Local),
            None => (default.to_string(), ContentSource::Default),
        }
    }

    /// Write-through on every input event; no remote traffic.
    pub fn cache_text(&self, id: &str, html: &str) -> WriteReport {
        let mut report = WriteReport::default();
        report.record(
            Sink::LocalCache,
            self.local.set_item(&text_key(id), &sanitize_html(html)),
        );
        report
    }

    /// Remote value for a text block, mirrored into the local cache.
    pub async fn fetch_text(&self, id: &str) -> Option<String> {
        let html = self.fetch_block(id).await?;
        let html = sanitize_html(&html);
        if let Err(e) = self.local.set_item(&text_key(id), &html) {
            tracing::debug!(id, error = %e, "could not mirror remote text into cache");
        }
        Some(html)
    }

    pub async fn save_text(&self, id: &str, html: &str) -> WriteReport {
        let html = sanitize_html(html);
        let mut report = WriteReport::default();
        report.record(Sink::LocalCache, self.local.set_item(&text_key(id), &html));
        self.push_block(&mut report, id, &html).await;
        report
    }

    // ---- images ------------------------------------------------------------

    pub fn cached_image(&self, id: &str) -> Option<String> {
        self.local
            .get_item(&image_key(id))
            .and_then(|u| clean_image_url(&u))
    }

    pub fn initial_image(&self, id: &str, default_src: &str) -> (String, ContentSource) {
        match self.cached_image(id) {
            Some(url) => (url, ContentSource::Local),
            None => (default_src.to_string(), ContentSource::Default),
        }
    }

    pub async fn fetch_image(&self, id: &str) -> Option<String> {
        let url = self.fetch_block(&remote_image_key(id)).await?;
        let url = clean_image_url(&url)?;
        let _ = self.local.set_item(&image_key(id), &url);
        Some(url)
    }

    /// Persist an uploaded image URL under `content:image:<id>` locally and
    /// `image:<id>` remotely.
    pub async fn save_image(&self, id: &str, url: &str) -> WriteReport {
        let mut report = WriteReport::default();
        let Some(url) = clean_image_url(url) else {
            report.record(
                Sink::LocalCache,
                Err(crate::api::CmsError::validation("Upload returned an unusable URL")),
            );
            return report;
        };
        report.record(Sink::LocalCache, self.local.set_item(&image_key(id), &url));
        self.push_block(&mut report, &remote_image_key(id), &url)
            .await;
        report
    }

    // ---- section styles ----------------------------------------------------

    pub fn cached_style(&self, id: &str) -> Option<SectionStyleValue> {
        load_json(&self.local, &style_key(id))
    }

    pub async fn fetch_style(&self, id: &str) -> Option<SectionStyleValue> {
        match self.remote.get_section_style(id).await {
            Ok(Some(rec)) => {
                let _ = save_json(&self.local, &style_key(id), &rec.value);
                Some(rec.value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(id, error = %e, "section style fetch failed; using local cache");
                None
            }
        }
    }

    /// Styles have no server fallback: the endpoint only takes `{key, html}`.
    pub async fn save_style(&self, id: &str, value: &SectionStyleValue) -> WriteReport {
        let mut report = WriteReport::default();
        report.record(Sink::LocalCache, save_json(&self.local, &style_key(id), value));
        let remote = self.remote.upsert_section_style(id, value).await;
        if let Err(e) = &remote {
            tracing::warn!(id, error = %e, "section style upsert failed; kept locally");
        }
        report.record(Sink::RemoteStore, remote);
        report
    }

    // ---- admin -------------------------------------------------------------

    /// Drop every `content:` entry from this browser. Remote rows are untouched,
    /// so the next successful fetch restores synced edits.
    pub fn clear_local_content(&self) -> usize {
        let removed = clear_local_content(&self.local);
        tracing::info!(removed, "cleared local content cache");
        removed
    }

    // ---- shared ------------------------------------------------------------

    async fn fetch_block(&self, key: &str) -> Option<String> {
        match self.remote.get_content_block(key).await {
            Ok(Some(block)) => Some(block.html),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "content fetch failed; using local cache");
                None
            }
        }
    }

    /// Remote store first; the server fallback runs only when that write fails.
    async fn push_block(&self, report: &mut WriteReport, key: &str, value: &str) {
        match self.remote.upsert_content_block(key, value).await {
            Ok(()) => report.record(Sink::RemoteStore, Ok(())),
            Err(e) => {
                tracing::warn!(key, error = %e, "direct upsert failed; trying server fallback");
                report.record(Sink::RemoteStore, Err(e));

                let fallback = self.fallback.upsert_via_server(key, value).await;
                if let Err(e) = &fallback {
                    tracing::warn!(key, error = %e, "server fallback failed; value is local only");
                }
                report.record(Sink::ServerFallback, fallback);
            }
        }
    }
}

/// Accept absolute http(s) URLs and root-relative paths only.
pub(crate) fn clean_image_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '<' | '>')) {
        return None;
    }
    let ok = url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/');
    ok.then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rest::memory::MemoryRemote;
    use crate::api::site::memory::MemoryFallback;
    use crate::storage::memory::MemoryStorage;
    use futures::executor::block_on;

    type TestStore = ContentStore<MemoryStorage, MemoryRemote, MemoryFallback>;

    fn fixture() -> (TestStore, MemoryStorage, MemoryRemote, MemoryFallback) {
        let local = MemoryStorage::default();
        let remote = MemoryRemote::default();
        let fallback = MemoryFallback::default();
        let store = ContentStore::new(local.clone(), remote.clone(), fallback.clone());
        (store, local, remote, fallback)
    }

    #[test]
    fn local_value_shows_first_then_remote_replaces_it() {
        let (store, local, remote, _) = fixture();
        local.set_item(&text_key("home.intro"), "A").unwrap();
        remote
            .blocks
            .borrow_mut()
            .insert("home.intro".to_string(), "B".to_string());

        let (first, source) = store.initial_text("home.intro", "default");
        assert_eq!((first.as_str(), source), ("A", ContentSource::Local));

        let fetched = block_on(store.fetch_text("home.intro"));
        assert_eq!(fetched.as_deref(), Some("B"));
        assert_eq!(local.get_item(&text_key("home.intro")).as_deref(), Some("B"));
    }

    #[test]
    fn default_is_used_with_no_cache_and_no_row() {
        let (store, _, _, _) = fixture();
        assert_eq!(
            store.initial_text("home.intro", "Welcome"),
            ("Welcome".to_string(), ContentSource::Default)
        );
        assert_eq!(block_on(store.fetch_text("home.intro")), None);
    }

    #[test]
    fn failed_fetch_keeps_local_value() {
        let (store, local, remote, _) = fixture();
        local.set_item(&text_key("k"), "cached").unwrap();
        remote.fail_reads.set(true);

        assert_eq!(block_on(store.fetch_text("k")), None);
        assert_eq!(store.cached_text("k").as_deref(), Some("cached"));
    }

    #[test]
    fn remote_success_skips_fallback() {
        let (store, _, remote, fallback) = fixture();
        let report = block_on(store.save_text("k", "<b>hi</b>"));

        assert_eq!(report.status(), SaveStatus::Saved);
        assert_eq!(report.last_success(), Some(Sink::RemoteStore));
        assert!(!report.attempted(Sink::ServerFallback));
        assert!(fallback.calls.borrow().is_empty());
        assert_eq!(remote.blocks.borrow().get("k").map(String::as_str), Some("<strong>hi</strong>"));
    }

    #[test]
    fn rejected_upsert_goes_through_server_fallback_with_same_value() {
        let (store, _, remote, fallback) = fixture();
        remote.fail_writes.set(true);

        let report = block_on(store.save_text("k", "hello"));
        assert_eq!(report.status(), SaveStatus::Saved);
        assert_eq!(report.last_success(), Some(Sink::ServerFallback));

        let calls = fallback.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].key, "k");
        assert_eq!(calls[0].html, "hello");
    }

    #[test]
    fn both_remote_sinks_failing_leaves_value_in_cache() {
        let (store, local, remote, fallback) = fixture();
        remote.fail_writes.set(true);
        fallback.fail.set(true);

        let report = block_on(store.save_text("k", "attempted"));
        assert_eq!(report.status(), SaveStatus::LocalOnly);
        assert!(report.last_error().is_some());
        assert_eq!(local.get_item(&text_key("k")).as_deref(), Some("attempted"));
    }

    #[test]
    fn full_cache_with_working_remote_still_saves() {
        let (store, local, _, _) = fixture();
        local.set_read_only(true);
        let report = block_on(store.save_text("k", "x"));
        assert!(!report.local_ok());
        assert_eq!(report.status(), SaveStatus::Saved);
    }

    #[test]
    fn hero_title_is_stored_sanitized_everywhere() {
        let (store, local, remote, _) = fixture();
        let id = "home.hero.title.primary";
        let report = block_on(store.save_text(id, "Hello <b>World</b><script>alert(1)</script>"));
        assert_eq!(report.status(), SaveStatus::Saved);

        let expected = "Hello <strong>World</strong>alert(1)";
        assert_eq!(local.get_item(&text_key(id)).as_deref(), Some(expected));
        assert_eq!(remote.blocks.borrow().get(id).map(String::as_str), Some(expected));
    }

    #[test]
    fn cache_write_through_has_no_remote_traffic() {
        let (store, local, remote, _) = fixture();
        let report = store.cache_text("k", "<div>typing</div>");
        assert!(report.local_ok());
        assert!(!report.attempted(Sink::RemoteStore));
        assert_eq!(remote.writes.get(), 0);
        assert_eq!(local.get_item(&text_key("k")).as_deref(), Some("typing"));
    }

    #[test]
    fn image_uses_prefixed_keys_and_fallback() {
        let (store, local, remote, fallback) = fixture();
        let report = block_on(store.save_image("logo", "https://cdn.example.org/logo.png"));
        assert_eq!(report.status(), SaveStatus::Saved);
        assert_eq!(
            local.get_item("content:image:logo").as_deref(),
            Some("https://cdn.example.org/logo.png")
        );
        assert!(remote.blocks.borrow().contains_key("image:logo"));

        remote.fail_writes.set(true);
        let report = block_on(store.save_image("logo", "/uploads/logo2.png"));
        assert_eq!(report.last_success(), Some(Sink::ServerFallback));
        assert_eq!(fallback.calls.borrow()[0].key, "image:logo");
    }

    #[test]
    fn image_with_unusable_url_is_rejected_before_io() {
        let (store, _, remote, _) = fixture();
        let report = block_on(store.save_image("logo", "javascript:alert(1)"));
        assert_eq!(report.status(), SaveStatus::Failed);
        assert_eq!(remote.writes.get(), 0);
    }

    #[test]
    fn fetch_image_reads_remote_image_key() {
        let (store, _, remote, _) = fixture();
        remote
            .blocks
            .borrow_mut()
            .insert("image:logo".to_string(), "/uploads/logo.png".to_string());
        assert_eq!(block_on(store.fetch_image("logo")).as_deref(), Some("/uploads/logo.png"));
        assert_eq!(store.cached_image("logo").as_deref(), Some("/uploads/logo.png"));
    }

    #[test]
    fn style_save_has_no_server_fallback() {
        let (store, _, remote, fallback) = fixture();
        remote.fail_writes.set(true);
        let value = SectionStyleValue {
            background_color: Some("#112233".to_string()),
            color: Some("#ffffff".to_string()),
        };

        let report = block_on(store.save_style("home.hero", &value));
        assert_eq!(report.status(), SaveStatus::LocalOnly);
        assert!(!report.attempted(Sink::ServerFallback));
        assert!(fallback.calls.borrow().is_empty());
        assert_eq!(store.cached_style("home.hero"), Some(value));
    }

    #[test]
    fn style_fetch_mirrors_into_cache() {
        let (store, _, remote, _) = fixture();
        let value = SectionStyleValue {
            background_color: None,
            color: Some("#000000".to_string()),
        };
        remote
            .styles
            .borrow_mut()
            .insert("library".to_string(), value.clone());

        assert_eq!(block_on(store.fetch_style("library")), Some(value.clone()));
        assert_eq!(store.cached_style("library"), Some(value));
    }

    #[test]
    fn clearing_local_content_keeps_remote_rows_for_reload() {
        let (store, local, remote, _) = fixture();
        block_on(store.save_text("chapel.title", "Synced"));
        local.set_item(&text_key("draft.only"), "never synced").unwrap();

        assert_eq!(store.clear_local_content(), 2);
        assert_eq!(store.cached_text("chapel.title"), None);
        assert!(remote.blocks.borrow().contains_key("chapel.title"));

        // Reload: default first, then the remote row restores the edit.
        assert_eq!(store.initial_text("chapel.title", "Chapel").1, ContentSource::Default);
        assert_eq!(block_on(store.fetch_text("chapel.title")).as_deref(), Some("Synced"));
        assert_eq!(block_on(store.fetch_text("draft.only")), None);
    }

    #[test]
    fn image_urls_are_checked() {
        assert_eq!(clean_image_url(" /a.png ").as_deref(), Some("/a.png"));
        assert!(clean_image_url("https://x.org/a b.png").is_none());
        assert!(clean_image_url("data:text/html,<b>").is_none());
        assert!(clean_image_url("").is_none());
    }

    /// Mirrors the text block's cadence: cache on input, autosave on pause,
    /// final upsert on blur when the value differs from the last accepted one.
    #[test]
    fn revert_after_autosave_reaches_remote_on_blur() {
        use crate::editing::EditBuffer;

        let (store, local, remote, _) = fixture();
        let mut buffer = EditBuffer::new("Original".to_string());

        let typo = buffer.on_input("Typo");
        store.cache_text("home.intro", &typo);
        let report = block_on(store.save_text("home.intro", &typo));
        assert!(report.remote_ok());
        buffer.mark_pushed(&typo);

        let reverted = buffer.on_input("Original");
        store.cache_text("home.intro", &reverted);
        let on_blur = buffer.commit().expect("revert differs from the autosaved value");
        block_on(store.save_text("home.intro", &on_blur));

        assert_eq!(local.get_item(&text_key("home.intro")).as_deref(), Some("Original"));
        assert_eq!(
            remote.blocks.borrow().get("home.intro").map(String::as_str),
            Some("Original")
        );
        assert_eq!(block_on(store.fetch_text("home.intro")).as_deref(), Some("Original"));
    }
}
