use super::AFFORDANCE_CLASS;
use crate::api::{CmsError, CmsResult};
use crate::cms::{SiteStore, WriteReport};
use crate::components::ui::spinner::Spinner;
use crate::editing::{validate_image_file, UploadStatus};
use crate::state::AppContext;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::set_timeout;
use std::time::Duration;
use web_sys::{File, Url};

const SAVED_BADGE_MS: u64 = 2000;

async fn read_file_bytes(file: &File) -> CmsResult<Vec<u8>> {
    let buf = wasm_bindgen_futures::JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| CmsError::validation(format!("Could not read file: {e:?}")))?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

async fn upload_and_save(store: &SiteStore, id: &str, file: &File) -> CmsResult<(String, WriteReport)> {
    let bytes = read_file_bytes(file).await?;
    let url = store
        .fallback()
        .upload_image(&file.name(), &file.type_(), bytes)
        .await?;
    let report = store.save_image(id, &url).await;
    Ok((url, report))
}

/// An image that can be replaced by upload while edit mode is on.
#[component]
pub fn EditableImage(
    #[prop(into)] id: String,
    #[prop(into)] default_src: String,
    #[prop(into, optional)] alt: String,
    #[prop(into, optional)] class: String,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let edit_mode = app_state.0.edit_mode;
    let store = StoredValue::new(app_state.0.store.clone());
    let id_sv = StoredValue::new(id.clone());

    let (initial, _) = store.with_value(|s| s.initial_image(&id, &default_src));
    let src = RwSignal::new(initial);
    let status = RwSignal::new(UploadStatus::Idle);
    let file_ref: NodeRef<html::Input> = NodeRef::new();
    let preview_url: StoredValue<Option<String>> = StoredValue::new(None);

    {
        let store = app_state.0.store.clone();
        let id = id.clone();
        spawn_local(async move {
            let Some(url) = store.fetch_image(&id).await else {
                return;
            };
            // An upload in flight owns the displayed image.
            if status.try_get_untracked() == Some(UploadStatus::Idle) {
                let _ = src.try_set(url);
            }
        });
    }

    let revoke_preview = move || {
        if let Some(url) = preview_url.get_value() {
            let _ = Url::revoke_object_url(&url);
            preview_url.set_value(None);
        }
    };

    let open_picker = move |_| {
        if !edit_mode.get_untracked() || status.get_untracked() == UploadStatus::Uploading {
            return;
        }
        if let Some(input) = file_ref.get() {
            input.click();
        }
    };

    let on_file = move |_| {
        let Some(input) = file_ref.get() else {
            return;
        };
        let Some(file) = input.files().and_then(|list| list.get(0)) else {
            return;
        };
        // Lets the same file be picked again after an error.
        input.set_value("");

        if let Err(e) = validate_image_file(&file.type_(), file.size() as u64) {
            let _ = window().alert_with_message(&e.message);
            return;
        }

        revoke_preview();
        if let Ok(url) = Url::create_object_url_with_blob(&file) {
            preview_url.set_value(Some(url.clone()));
            src.set(url);
        }
        status.set(UploadStatus::Uploading);

        let store = store.get_value();
        let id = id_sv.get_value();
        spawn_local(async move {
            match upload_and_save(&store, &id, &file).await {
                Ok((url, report)) => {
                    let _ = src.try_set(url);
                    revoke_preview();
                    let next = UploadStatus::from_save(report.status());
                    if next == UploadStatus::Saved {
                        set_timeout(
                            move || {
                                if status.try_get_untracked() == Some(UploadStatus::Saved) {
                                    let _ = status.try_set(UploadStatus::Idle);
                                }
                            },
                            Duration::from_millis(SAVED_BADGE_MS),
                        );
                    }
                    let _ = status.try_set(next);
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "image upload failed; keeping preview");
                    let _ = status.try_set(UploadStatus::Error(e.message));
                }
            }
        });
    };

    view! {
        <div class="relative inline-block" data-content-id=id>
            <img
                src=move || src.get()
                alt=alt
                class=move || {
                    let hint = if edit_mode.get() { " cursor-pointer ring-1 ring-dashed ring-border" } else { "" };
                    format!("{class}{hint}")
                }
                on:click=open_picker
            />
            <input
                node_ref=file_ref
                type="file"
                accept="image/*"
                class="hidden"
                on:change=on_file
            />
            <Show when=move || edit_mode.get() && status.with(|s| s.label().is_some())>
                <span
                    class=move || {
                        let tone = if matches!(status.get(), UploadStatus::Error(_)) {
                            " text-destructive"
                        } else {
                            ""
                        };
                        format!("absolute bottom-1 left-1 inline-flex items-center gap-1 {AFFORDANCE_CLASS}{tone}")
                    }
                    title=move || match status.get() {
                        UploadStatus::Error(message) => message,
                        _ => String::new(),
                    }
                >
                    <Show when=move || status.get() == UploadStatus::Uploading>
                        <Spinner class="size-3" />
                    </Show>
                    {move || status.with(|s| s.label().unwrap_or_default().to_string())}
                </span>
            </Show>
        </div>
    }
}
