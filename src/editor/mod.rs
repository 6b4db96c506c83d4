mod image;
mod section;
mod selection;
mod text;

pub(crate) use image::EditableImage;
pub(crate) use section::SectionStyle;
pub(crate) use text::EditableText;

use leptos::prelude::*;
use wasm_bindgen::JsCast;

/// Idle time after the last keystroke before a text block is pushed remotely.
///
/// Every input event still writes through to the local cache; the debounce only
/// merges the per-input remote upserts into one per pause, and blur flushes.
pub(crate) const AUTOSAVE_MS: i32 = 1200;

/// Run `f` after `ms`, replacing any callback still pending in `slot`.
pub(crate) fn debounce(slot: StoredValue<Option<i32>>, ms: i32, f: impl FnOnce() + 'static) {
    let Some(win) = web_sys::window() else {
        return;
    };

    cancel_pending(slot);

    let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
        slot.set_value(None);
        f();
    });
    let tid = win
        .set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), ms)
        .ok();
    slot.set_value(tid);
}

pub(crate) fn cancel_pending(slot: StoredValue<Option<i32>>) {
    let Some(tid) = slot.get_value() else {
        return;
    };
    if let Some(win) = web_sys::window() {
        win.clear_timeout_with_handle(tid);
    }
    slot.set_value(None);
}

/// Shared class for the small edit affordances (toolbar buttons, status badges).
pub(crate) const AFFORDANCE_CLASS: &str =
    "rounded border border-border bg-background/90 px-1.5 py-0.5 text-xs text-foreground shadow-xs";
