use super::selection::{capture_selection, place_caret};
use super::{cancel_pending, debounce, AFFORDANCE_CLASS, AUTOSAVE_MS};
use crate::cms::SaveStatus;
use crate::editing::EditBuffer;
use crate::html::styling::{apply_style, StyleCommand, TextRange};
use crate::html::{parse_fragment, sanitize_html, serialize};
use crate::state::AppContext;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::HtmlElement;

/// Restyle `range` inside `el` and write the sanitized result back to the DOM.
/// Returns `None` when the command had nothing to act on.
fn restyle(el: &HtmlElement, range: TextRange, base_px: f32, cmd: &StyleCommand) -> Option<()> {
    let nodes = parse_fragment(&el.inner_html());
    let styled = apply_style(&nodes, range, cmd, base_px)?;
    el.set_inner_html(&sanitize_html(&serialize(&styled.nodes)));
    place_caret(el, styled.caret);
    Some(())
}

/// An inline-editable rich text block persisted under `content:<id>`.
#[component]
pub fn EditableText(
    #[prop(into)] id: String,
    #[prop(into, optional)] default: String,
    #[prop(into, optional)] class: String,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let edit_mode = app_state.0.edit_mode;
    let store = StoredValue::new(app_state.0.store.clone());
    let id_sv = StoredValue::new(id.clone());

    let (initial, source) = store.with_value(|s| s.initial_text(&id, &default));
    tracing::trace!(id = %id, source = ?source, "text block initialised");

    let buffer = RwSignal::new(EditBuffer::new(initial));
    let committed = Memo::new(move |_| buffer.with(|b| b.committed().to_string()));
    let save_status: RwSignal<Option<SaveStatus>> = RwSignal::new(None);
    let el_ref: NodeRef<html::Div> = NodeRef::new();
    let autosave: StoredValue<Option<i32>> = StoredValue::new(None);

    // Selection snapshot for the colour picker, which takes focus away.
    let picker_range: StoredValue<Option<(TextRange, f32)>> = StoredValue::new(None);

    {
        let store = app_state.0.store.clone();
        let id = id.clone();
        spawn_local(async move {
            if let Some(html) = store.fetch_text(&id).await {
                let _ = buffer.try_update(|b| b.replace_committed(html));
            }
        });
    }

    let persist = move |html: String| {
        let store = store.get_value();
        let id = id_sv.get_value();
        spawn_local(async move {
            let report = store.save_text(&id, &html).await;
            if report.remote_ok() {
                let _ = buffer.try_update_untracked(|b| b.mark_pushed(&html));
            }
            let _ = save_status.try_set(Some(report.status()));
        });
    };

    let on_input = move || {
        let Some(el) = el_ref.get() else {
            return;
        };
        let Some(clean) = buffer.try_update_untracked(|b| b.on_input(&el.inner_html())) else {
            return;
        };
        let report = store.with_value(|s| s.cache_text(&id_sv.get_value(), &clean));
        if !report.local_ok() {
            save_status.set(Some(report.status()));
        }
        debounce(autosave, AUTOSAVE_MS, move || persist(clean));
    };

    // Final upsert, compared against the last accepted value rather than `committed`.
    let finish_edit = move || {
        cancel_pending(autosave);
        let Some(html) = buffer.try_update(|b| b.commit()).flatten() else {
            return;
        };
        persist(html);
    };

    let run_command = move |cmd: StyleCommand, snapshot: Option<(TextRange, f32)>| {
        let Some(el) = el_ref.get() else {
            return;
        };
        let Some((range, base_px)) = snapshot.or_else(|| capture_selection(&el)) else {
            tracing::trace!(command = %cmd, "style command ignored: no selection in block");
            return;
        };
        if restyle(&el, range, base_px, &cmd).is_none() {
            return;
        }
        on_input();
    };

    let on_color = move |ev: web_sys::Event| {
        let color = event_target_value(&ev);
        let snapshot = picker_range.get_value();
        picker_range.set_value(None);
        run_command(StyleCommand::Color(color), snapshot);
        // The picker holds focus, so the block has already blurred.
        finish_edit();
    };

    let tool_button = move |label: &'static str, title: &'static str, cmd: StyleCommand| {
        view! {
            <button
                type="button"
                title=title
                class=format!("{AFFORDANCE_CLASS} hover:bg-accent")
                on:mousedown=|ev: web_sys::MouseEvent| ev.prevent_default()
                on:click=move |_| run_command(cmd.clone(), None)
            >
                {label}
            </button>
        }
    };

    view! {
        <div class="relative" data-content-id=id>
            <Show when=move || edit_mode.get()>
                <div class="mb-1 flex items-center gap-1">
                    {tool_button("B", "Bold", StyleCommand::Bold)}
                    {tool_button("A+", "Larger text", StyleCommand::FontSizeUp)}
                    {tool_button("A-", "Smaller text", StyleCommand::FontSizeDown)}
                    <input
                        type="color"
                        title="Text colour"
                        class="h-6 w-6 cursor-pointer rounded border border-border bg-transparent p-0"
                        on:mousedown=move |_| {
                            let snapshot = el_ref.get().and_then(|el| capture_selection(&el));
                            picker_range.set_value(snapshot);
                        }
                        on:change=on_color
                    />
                    <Show when=move || {
                        matches!(save_status.get(), Some(SaveStatus::LocalOnly | SaveStatus::Failed))
                    }>
                        <span class=format!("{AFFORDANCE_CLASS} text-destructive")>"Save issue"</span>
                    </Show>
                </div>
            </Show>
            <div
                node_ref=el_ref
                class=move || {
                    let ring = if edit_mode.get() {
                        " outline-dashed outline-1 outline-border focus:outline-primary"
                    } else {
                        ""
                    };
                    format!("{class}{ring}")
                }
                contenteditable=move || if edit_mode.get() { "true" } else { "false" }
                inner_html=move || committed.get()
                on:input=move |_| on_input()
                on:blur=move |_| finish_edit()
            ></div>
        </div>
    }
}
