use crate::api::{AuthClient, EnvConfig, RestStore, SiteApi};
use crate::cms::{ContentStore, SiteStore};
use crate::models::Session;
use crate::storage::{
    clear_session, load_edit_mode, load_session, save_edit_mode, save_session, BrowserStorage,
};
use crate::util::now_ms;
use leptos::prelude::*;

#[derive(Clone)]
pub(crate) struct AppState {
    pub auth: AuthClient,
    pub store: SiteStore,

    /// Signed-in editor, if any. Writes to the row store need it.
    pub session: RwSignal<Option<Session>>,

    /// Global edit mode: editable components show their affordances while on.
    pub edit_mode: RwSignal<bool>,
}

impl AppState {
    pub fn new() -> Self {
        let config = EnvConfig::new();
        let local = BrowserStorage;

        let session = load_session(&local).filter(|s| !s.is_expired(now_ms()));
        if session.is_none() {
            clear_session(&local);
        }

        let remote = RestStore::new(&config);
        remote.set_token(session.as_ref().map(|s| s.access_token.clone()));

        let edit_mode = session.is_some() && load_edit_mode(&local);

        tracing::debug!(
            store_url = %config.store_url,
            signed_in = session.is_some(),
            "app state initialised"
        );

        Self {
            auth: AuthClient::new(&config),
            store: ContentStore::new(local, remote, SiteApi::new(&config)),
            session: RwSignal::new(session),
            edit_mode: RwSignal::new(edit_mode),
        }
    }

    pub fn sign_in(&self, session: Session) {
        if let Err(e) = save_session(&BrowserStorage, &session) {
            tracing::warn!(error = %e, "session not persisted; sign-in lasts for this page only");
        }
        self.store.remote().set_token(Some(session.access_token.clone()));
        tracing::info!(email = %session.email, "editor signed in");
        self.session.set(Some(session));
    }

    pub fn sign_out(&self) {
        clear_session(&BrowserStorage);
        self.store.remote().set_token(None);
        self.session.set(None);
        self.edit_mode.set(false);
    }

    /// Edit mode only turns on for a signed-in editor.
    pub fn set_edit_mode(&self, on: bool) {
        let on = on && self.session.get_untracked().is_some();
        save_edit_mode(&BrowserStorage, on);
        self.edit_mode.set(on);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
