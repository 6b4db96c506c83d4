use crate::api::{CmsError, CmsResult};
use crate::models::Session;
use serde::{Deserialize, Serialize};

pub(crate) const CONTENT_PREFIX: &str = "content:";
pub(crate) const IMAGE_PREFIX: &str = "content:image:";
pub(crate) const SECTION_STYLE_PREFIX: &str = "section-style:";

pub(crate) const SESSION_KEY: &str = "site_session";
pub(crate) const EDIT_MODE_KEY: &str = "site_edit_mode";

pub(crate) fn text_key(id: &str) -> String {
    format!("{CONTENT_PREFIX}{id}")
}

pub(crate) fn image_key(id: &str) -> String {
    format!("{IMAGE_PREFIX}{id}")
}

pub(crate) fn style_key(id: &str) -> String {
    format!("{SECTION_STYLE_PREFIX}{id}")
}

/// Key of an image row in the remote `content_blocks` table.
pub(crate) fn remote_image_key(id: &str) -> String {
    format!("image:{id}")
}

/// Browser-local key-value store.
///
/// Reads fail soft (a missing store reads as empty); writes report failure so the
/// caller can surface it in a write report.
pub(crate) trait KvStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> CmsResult<()>;
    fn remove_item(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl KvStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> CmsResult<()> {
        let storage =
            Self::storage().ok_or_else(|| CmsError::storage("localStorage is unavailable"))?;
        storage
            .set_item(key, value)
            .map_err(|_| CmsError::storage(format!("could not write {key} to localStorage")))
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(storage) = Self::storage() else {
            return vec![];
        };
        let len = storage.length().unwrap_or(0);
        (0..len)
            .filter_map(|i| storage.key(i).ok().flatten())
            .collect()
    }
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(store: &impl KvStore, key: &str) -> Option<T> {
    let json = store.get_item(key)?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json<T: Serialize>(store: &impl KvStore, key: &str, value: &T) -> CmsResult<()> {
    let json = serde_json::to_string(value).map_err(CmsError::parse)?;
    store.set_item(key, &json)
}

/// Remove every `content:` entry (text and images). Section styles, the session
/// and all remote rows are left alone.
pub(crate) fn clear_local_content(store: &impl KvStore) -> usize {
    let keys: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|k| k.starts_with(CONTENT_PREFIX))
        .collect();
    for k in &keys {
        store.remove_item(k);
    }
    keys.len()
}

pub(crate) fn load_session(store: &impl KvStore) -> Option<Session> {
    load_json(store, SESSION_KEY)
}

pub(crate) fn save_session(store: &impl KvStore, session: &Session) -> CmsResult<()> {
    save_json(store, SESSION_KEY, session)
}

pub(crate) fn clear_session(store: &impl KvStore) {
    store.remove_item(SESSION_KEY);
    store.remove_item(EDIT_MODE_KEY);
}

pub(crate) fn load_edit_mode(store: &impl KvStore) -> bool {
    store
        .get_item(EDIT_MODE_KEY)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

pub(crate) fn save_edit_mode(store: &impl KvStore, on: bool) {
    if on {
        let _ = store.set_item(EDIT_MODE_KEY, "1");
    } else {
        store.remove_item(EDIT_MODE_KEY);
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// In-memory `KvStore` for tests. Clones share the same map.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryStorage {
        items: Rc<RefCell<BTreeMap<String, String>>>,
        read_only: Rc<Cell<bool>>,
    }

    impl MemoryStorage {
        pub fn set_read_only(&self, on: bool) {
            self.read_only.set(on);
        }

        pub fn len(&self) -> usize {
            self.items.borrow().len()
        }
    }

    impl KvStore for MemoryStorage {
        fn get_item(&self, key: &str) -> Option<String> {
            self.items.borrow().get(key).cloned()
        }

        fn set_item(&self, key: &str, value: &str) -> CmsResult<()> {
            if self.read_only.get() {
                return Err(CmsError::storage("quota exceeded"));
            }
            self.items
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove_item(&self, key: &str) {
            self.items.borrow_mut().remove(key);
        }

        fn keys(&self) -> Vec<String> {
            self.items.borrow().keys().cloned().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;

    #[test]
    fn key_prefixes() {
        assert_eq!(text_key("home.hero.title.primary"), "content:home.hero.title.primary");
        assert_eq!(image_key("logo"), "content:image:logo");
        assert_eq!(style_key("home.hero"), "section-style:home.hero");
        assert_eq!(remote_image_key("logo"), "image:logo");
    }

    #[test]
    fn clear_local_content_only_touches_content_keys() {
        let store = MemoryStorage::default();
        store.set_item(&text_key("a"), "A").unwrap();
        store.set_item(&image_key("logo"), "/logo.png").unwrap();
        store.set_item(&style_key("hero"), "{}").unwrap();
        store.set_item(SESSION_KEY, "{}").unwrap();

        assert_eq!(clear_local_content(&store), 2);
        assert!(store.get_item(&text_key("a")).is_none());
        assert!(store.get_item(&image_key("logo")).is_none());
        assert!(store.get_item(&style_key("hero")).is_some());
        assert!(store.get_item(SESSION_KEY).is_some());
        assert_eq!(store.len(), 2);
        assert_eq!(clear_local_content(&store), 0);
    }

    #[test]
    fn session_roundtrip_and_clear() {
        let store = MemoryStorage::default();
        let s = Session {
            email: "editor@example.org".to_string(),
            access_token: "jwt".to_string(),
            expires_at_ms: 42,
        };
        save_session(&store, &s).unwrap();
        save_edit_mode(&store, true);
        assert_eq!(load_session(&store), Some(s));
        assert!(load_edit_mode(&store));

        clear_session(&store);
        assert!(load_session(&store).is_none());
        assert!(!load_edit_mode(&store));
    }

    #[test]
    fn corrupt_json_reads_as_missing() {
        let store = MemoryStorage::default();
        store.set_item(SESSION_KEY, "{not json").unwrap();
        assert!(load_session(&store).is_none());
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn browser_storage_roundtrip_and_clear() {
        let store = BrowserStorage;
        store.set_item(&text_key("wasm.test"), "<strong>x</strong>").unwrap();
        store.set_item(&style_key("wasm.test"), "{}").unwrap();
        assert_eq!(
            store.get_item(&text_key("wasm.test")).as_deref(),
            Some("<strong>x</strong>")
        );

        assert!(clear_local_content(&store) >= 1);
        assert!(store.get_item(&text_key("wasm.test")).is_none());
        assert!(store.get_item(&style_key("wasm.test")).is_some());
        store.remove_item(&style_key("wasm.test"));
    }
}
