//! DOM selection helpers for contentEditable blocks.
//!
//! Positions cross the DOM/tree boundary as UTF-16 text offsets from the start of
//! the editable element, the same unit `Range` uses inside text nodes.

use crate::html::styling::{resolve_base_font, TextRange};
use crate::util::parse_px;
use leptos::prelude::window;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, Node, Range};

/// Bounds and base font size of the active selection, if it is non-collapsed
/// and inside `root`.
pub(crate) fn capture_selection(root: &HtmlElement) -> Option<(TextRange, f32)> {
    let selection = window().get_selection().ok().flatten()?;
    if selection.range_count() == 0 || selection.is_collapsed() {
        return None;
    }
    let range = selection.get_range_at(0).ok()?;
    let ancestor = range.common_ancestor_container().ok()?;
    let root_node: &Node = root.as_ref();
    if !root_node.contains(Some(&ancestor)) {
        return None;
    }

    let start = text_offset(root_node, &range.start_container().ok()?, range.start_offset().ok()?)?;
    let end = text_offset(root_node, &range.end_container().ok()?, range.end_offset().ok()?)?;
    Some((TextRange::new(start, end), resolve_base_font(computed_font_px(&range))))
}

fn text_offset(root: &Node, container: &Node, offset: u32) -> Option<usize> {
    let doc = window().document()?;
    let r = doc.create_range().ok()?;
    r.set_start(root, 0).ok()?;
    r.set_end(container, offset).ok()?;
    Some(String::from(r.to_string()).encode_utf16().count())
}

fn computed_font_px(range: &Range) -> Option<f32> {
    let container = range.start_container().ok()?;
    let el: Element = match container.dyn_ref::<Element>() {
        Some(e) => e.clone(),
        None => container.parent_element()?,
    };
    let style = window().get_computed_style(&el).ok().flatten()?;
    parse_px(&style.get_property_value("font-size").ok()?)
}

fn collect_text_nodes(node: &Node, out: &mut Vec<Node>) {
    let children = node.child_nodes();
    for i in 0..children.length() {
        let Some(child) = children.item(i) else {
            continue;
        };
        if child.node_type() == Node::TEXT_NODE {
            out.push(child);
        } else {
            collect_text_nodes(&child, out);
        }
    }
}

/// Text node and in-node offset for `caret`. On a node boundary the start of the
/// following text node wins, so the caret lands after an inserted wrapper.
fn find_text_position(root: &Node, caret: usize) -> Option<(Node, u32)> {
    let mut nodes = Vec::new();
    collect_text_nodes(root, &mut nodes);

    let mut acc = 0usize;
    let mut boundary = None;
    for node in nodes {
        let len = node
            .text_content()
            .unwrap_or_default()
            .encode_utf16()
            .count();
        if len == 0 {
            continue;
        }
        if acc + len > caret {
            return Some((node, (caret - acc) as u32));
        }
        if acc + len == caret {
            boundary = Some((node, len as u32));
        }
        acc += len;
    }
    boundary
}

/// Collapse the selection to `caret` inside `root` (end of `root` if out of range).
pub(crate) fn place_caret(root: &HtmlElement, caret: usize) {
    let Some(selection) = window().get_selection().ok().flatten() else {
        return;
    };
    let Some(range) = window().document().and_then(|d| d.create_range().ok()) else {
        return;
    };

    let root_node: &Node = root.as_ref();
    let positioned = match find_text_position(root_node, caret) {
        Some((node, offset)) => range.set_start(&node, offset).is_ok(),
        None => {
            let ok = range.select_node_contents(root_node).is_ok();
            range.collapse_with_to_start(false);
            ok
        }
    };
    if !positioned {
        return;
    }

    range.collapse_with_to_start(true);
    let _ = selection.remove_all_ranges();
    let _ = selection.add_range(&range);
}
