use super::{is_safe_style_value, split_nodes, text_len_utf16, Element, Node};

pub(crate) const DEFAULT_FONT_PX: f32 = 16.0;
const MIN_FONT_PX: f32 = 8.0;
const FONT_STEP_PX: f32 = 2.0;

/// Toolbar formatting actions.
#[derive(Clone, Debug, PartialEq, strum::Display)]
pub(crate) enum StyleCommand {
    #[strum(to_string = "bold")]
    Bold,
    #[strum(to_string = "font-size-up")]
    FontSizeUp,
    #[strum(to_string = "font-size-down")]
    FontSizeDown,
    #[strum(to_string = "color")]
    Color(String),
}

/// Selection bounds as UTF-16 offsets into the fragment's text content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StyledFragment {
    pub nodes: Vec<Node>,
    /// Text offset directly after the inserted wrapper.
    pub caret: usize,
}

impl StyleCommand {
    fn wrapper(&self, base_font_px: f32) -> Option<Element> {
        match self {
            StyleCommand::Bold => Some(Element::new("strong")),
            StyleCommand::FontSizeUp => Some(font_size_span(base_font_px + FONT_STEP_PX)),
            StyleCommand::FontSizeDown => {
                Some(font_size_span((base_font_px - FONT_STEP_PX).max(MIN_FONT_PX)))
            }
            StyleCommand::Color(c) => {
                let c = c.trim();
                is_safe_style_value(c).then(|| Element::new("span").with_attr("style", &format!("color: {c}")))
            }
        }
    }
}

fn font_size_span(px: f32) -> Element {
    Element::new("span").with_attr("style", &format!("font-size: {px}px"))
}

/// Base size for relative font steps: the container's computed size, else 16px.
pub(crate) fn resolve_base_font(computed_px: Option<f32>) -> f32 {
    computed_px
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(DEFAULT_FONT_PX)
}

/// Wrap the selected text in a formatting element.
///
/// Returns `None` when the range is collapsed or runs past the fragment's text,
/// which callers treat as a no-op. The wrapper is inserted inside the deepest
/// element that fully contains the range.
pub(crate) fn apply_style(
    nodes: &[Node],
    range: TextRange,
    command: &StyleCommand,
    base_font_px: f32,
) -> Option<StyledFragment> {
    if range.is_collapsed() || range.end > text_len_utf16(nodes) {
        return None;
    }

    let wrapper = command.wrapper(base_font_px)?;
    let mut out = nodes.to_vec();
    wrap_range(&mut out, range.start, range.end, wrapper);

    Some(StyledFragment {
        nodes: out,
        caret: range.end,
    })
}

fn wrap_range(children: &mut Vec<Node>, start: usize, end: usize, wrapper: Element) {
    let mut offset = 0;
    for child in children.iter_mut() {
        let len = child.text_len();
        if offset >= end {
            break;
        }
        if let Node::Element(el) = child {
            if start >= offset && end <= offset + len {
                wrap_range(&mut el.children, start - offset, end - offset, wrapper);
                return;
            }
        }
        offset += len;
    }

    let (mut before, rest) = split_nodes(std::mem::take(children), start);
    let (selected, after) = split_nodes(rest, end - start);
    before.push(Node::Element(Element {
        children: selected,
        ..wrapper
    }));
    before.extend(after);
    *children = before;
}
