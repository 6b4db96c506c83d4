use super::{parse_fragment, push_node, serialize, Element, Node};

/// Tags that survive sanitization. `b` is rewritten to `strong`.
pub(crate) const ALLOWED_TAGS: &[&str] = &["span", "strong", "b", "em", "br"];

/// Inline style properties that survive sanitization.
pub(crate) const ALLOWED_STYLE_PROPS: &[&str] = &["color", "font-weight", "font-size"];

const MAX_STYLE_VALUE_LEN: usize = 64;

/// Sanitize a rich-text fragment for storage and `innerHTML` rendering.
///
/// Disallowed elements are unwrapped (children hoisted, element removed) so their
/// text survives. Allowed elements keep only a rebuilt `style` attribute. The
/// function is idempotent.
pub(crate) fn sanitize_html(html: &str) -> String {
    serialize(&sanitize_nodes(parse_fragment(html)))
}

pub(crate) fn sanitize_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) => push_node(&mut out, Node::Text(t)),
            Node::Element(el) => {
                let style = el.attr("style").and_then(clean_style);
                let children = sanitize_nodes(el.children);

                let Some(tag) = normalize_tag(&el.tag) else {
                    for c in children {
                        push_node(&mut out, c);
                    }
                    continue;
                };

                let mut clean = Element::new(tag);
                if let Some(style) = style {
                    clean.attrs.push(("style".to_string(), style));
                }
                if tag != "br" {
                    clean.children = children;
                }
                out.push(Node::Element(clean));
            }
        }
    }
    out
}

fn normalize_tag(tag: &str) -> Option<&'static str> {
    let allowed = ALLOWED_TAGS.iter().find(|t| **t == tag)?;
    Some(if *allowed == "b" { "strong" } else { allowed })
}

/// Rebuild a `style` attribute keeping only allowed properties with safe values.
///
/// A repeated property keeps its last value at the position it first appeared.
pub(crate) fn clean_style(raw: &str) -> Option<String> {
    let mut decls: Vec<(String, String)> = Vec::new();
    for decl in raw.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value.trim();
        if !ALLOWED_STYLE_PROPS.contains(&prop.as_str()) || !is_safe_style_value(value) {
            continue;
        }
        match decls.iter_mut().find(|(p, _)| *p == prop) {
            Some(existing) => existing.1 = value.to_string(),
            None => decls.push((prop, value.to_string())),
        }
    }

    if decls.is_empty() {
        return None;
    }

    Some(
        decls
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Check a CSS value for anything that could escape the declaration or load resources.
pub(crate) fn is_safe_style_value(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_STYLE_VALUE_LEN {
        return false;
    }
    if value
        .chars()
        .any(|c| matches!(c, '<' | '>' | '"' | '\'' | '\\' | ';' | '{' | '}') || c.is_control())
    {
        return false;
    }
    let lower = value.to_ascii_lowercase();
    !["url(", "expression(", "javascript:", "/*", "@import"]
        .iter()
        .any(|bad| lower.contains(bad))
}
