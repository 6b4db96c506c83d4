use super::AFFORDANCE_CLASS;
use crate::cms::SaveStatus;
use crate::html::is_safe_style_value;
use crate::models::SectionStyleValue;
use crate::state::AppContext;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StyleField {
    Background,
    Text,
}

/// `<input type="color">` needs `#rrggbb`; other stored values show as black.
fn picker_value(v: Option<&str>) -> String {
    match v {
        Some(c) if c.len() == 7 && c.starts_with('#') => c.to_string(),
        _ => "#000000".to_string(),
    }
}

/// A page section whose background and text colour are editable.
#[component]
pub fn SectionStyle(
    #[prop(into)] id: String,
    #[prop(into, optional)] class: String,
    children: Children,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let edit_mode = app_state.0.edit_mode;
    let store = StoredValue::new(app_state.0.store.clone());
    let id_sv = StoredValue::new(id.clone());

    let initial = store.with_value(|s| s.cached_style(&id)).unwrap_or_default();
    let value = RwSignal::new(initial);
    let save_status: RwSignal<Option<SaveStatus>> = RwSignal::new(None);

    {
        let store = app_state.0.store.clone();
        let id = id.clone();
        spawn_local(async move {
            if let Some(remote) = store.fetch_style(&id).await {
                let _ = value.try_set(remote);
            }
        });
    }

    let on_pick = move |field: StyleField, ev: web_sys::Event| {
        let color = event_target_value(&ev);
        if !is_safe_style_value(&color) {
            return;
        }
        value.update(|v| match field {
            StyleField::Background => v.background_color = Some(color),
            StyleField::Text => v.color = Some(color),
        });

        let next: SectionStyleValue = value.get_untracked();
        let store = store.get_value();
        let id = id_sv.get_value();
        spawn_local(async move {
            let report = store.save_style(&id, &next).await;
            let _ = save_status.try_set(Some(report.status()));
        });
    };

    view! {
        <section
            class=format!("relative {class}")
            style=move || value.with(|v| v.to_css())
            data-section-id=id
        >
            <Show when=move || edit_mode.get()>
                <div class=format!("absolute right-2 top-2 z-10 flex items-center gap-2 {AFFORDANCE_CLASS}")>
                    <label class="flex items-center gap-1">
                        "Bg"
                        <input
                            type="color"
                            class="h-5 w-5 cursor-pointer border-0 bg-transparent p-0"
                            prop:value=move || value.with(|v| picker_value(v.background_color.as_deref()))
                            on:change=move |ev| on_pick(StyleField::Background, ev)
                        />
                    </label>
                    <label class="flex items-center gap-1">
                        "Text"
                        <input
                            type="color"
                            class="h-5 w-5 cursor-pointer border-0 bg-transparent p-0"
                            prop:value=move || value.with(|v| picker_value(v.color.as_deref()))
                            on:change=move |ev| on_pick(StyleField::Text, ev)
                        />
                    </label>
                    <Show when=move || matches!(save_status.get(), Some(SaveStatus::LocalOnly | SaveStatus::Failed))>
                        <span class="text-destructive">"Save issue"</span>
                    </Show>
                </div>
            </Show>
            {children()}
        </section>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picker_value_requires_hex() {
        assert_eq!(picker_value(Some("#1a2b3c")), "#1a2b3c");
        assert_eq!(picker_value(Some("red")), "#000000");
        assert_eq!(picker_value(None), "#000000");
    }
}
