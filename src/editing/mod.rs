use crate::api::{CmsError, CmsResult};
use crate::cms::SaveStatus;
use crate::html::sanitize_html;

pub(crate) const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Two-phase text state for a contentEditable block.
///
/// While the user types, the DOM owns the live markup and only `live` follows it;
/// `committed` (what the view renders) changes on commit. Re-rendering mid-edit
/// would reset the caret. `pushed` is the last value the remote store accepted,
/// which autosave can move ahead of `committed`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct EditBuffer {
    committed: String,
    live: Option<String>,
    pushed: String,
}

impl EditBuffer {
    pub fn new(committed: String) -> Self {
        Self {
            pushed: committed.clone(),
            committed,
            live: None,
        }
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn is_editing(&self) -> bool {
        self.live.is_some()
    }

    /// Record the element's current markup; returns the sanitized form to persist.
    pub fn on_input(&mut self, raw_html: &str) -> String {
        let clean = sanitize_html(raw_html);
        self.live = Some(clean.clone());
        clean
    }

    /// End the edit. Returns the value to upsert when it differs from what the
    /// remote store last accepted.
    pub fn commit(&mut self) -> Option<String> {
        let live = self.live.take()?;
        self.committed = live.clone();
        (live != self.pushed).then_some(live)
    }

    /// Record a value the remote store accepted.
    pub fn mark_pushed(&mut self, html: &str) {
        self.pushed = html.to_string();
    }

    /// Apply a value that arrived from the remote store. Ignored mid-edit so a late
    /// fetch never clobbers what the user is typing.
    pub fn replace_committed(&mut self, html: String) -> bool {
        if self.is_editing() || html == self.committed {
            return false;
        }
        self.pushed = html.clone();
        self.committed = html;
        true
    }
}

/// Transient image upload state shown next to an editable image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Saved,
    Error(String),
}

impl UploadStatus {
    /// The upload worked but only this browser knows about it.
    pub fn from_save(status: SaveStatus) -> Self {
        match status {
            SaveStatus::Saved => UploadStatus::Saved,
            SaveStatus::LocalOnly | SaveStatus::Failed => UploadStatus::Error("Save issue".to_string()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            UploadStatus::Idle => None,
            UploadStatus::Uploading => Some("Uploading…"),
            UploadStatus::Saved => Some("Saved"),
            UploadStatus::Error(_) => Some("Save issue"),
        }
    }
}

/// Client-side checks run before any upload request.
pub(crate) fn validate_image_file(mime: &str, size_bytes: u64) -> CmsResult<()> {
    if !mime.starts_with("image/") {
        return Err(CmsError::validation("Please choose an image file"));
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(CmsError::validation("Image must be 5 MB or smaller"));
    }
    Ok(())
}
