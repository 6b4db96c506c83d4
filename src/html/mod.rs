pub(crate) mod sanitize;
pub(crate) mod styling;

pub(crate) use sanitize::{is_safe_style_value, sanitize_html};

use crate::util::{utf16_len, utf16_to_byte_idx};

/// A parsed HTML fragment node.
///
/// Comments, doctypes and processing instructions are dropped while parsing, so
/// a fragment only ever holds elements and text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching close tag. Browsers
/// serialize the non-RCDATA ones unescaped in `innerHTML`, so they must not be
/// re-tokenized or text offsets drift from the DOM.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
    "plaintext",
];

/// RCDATA elements: raw text, but entities are decoded.
const RCDATA_TAGS: &[&str] = &["textarea", "title"];

/// Open elements deeper than this are unwrapped; their content joins the parent.
/// Every tree walk recurses per level, so the cap bounds stack use.
pub(crate) const MAX_DEPTH: usize = 256;

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this element with no children.
    pub fn shell(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }
}

impl Node {
    /// Text length in UTF-16 code units, the unit DOM ranges use for offsets.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(t) => utf16_len(t),
            Node::Element(el) => text_len_utf16(&el.children),
        }
    }
}

pub(crate) fn text_len_utf16(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::text_len).sum()
}

pub(crate) fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for n in nodes {
        match n {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => out.push_str(&text_content(&el.children)),
        }
    }
    out
}

/// Append a node, merging adjacent text nodes.
pub(crate) fn push_node(out: &mut Vec<Node>, node: Node) {
    match node {
        Node::Text(t) => {
            if t.is_empty() {
                return;
            }
            if let Some(Node::Text(prev)) = out.last_mut() {
                prev.push_str(&t);
            } else {
                out.push(Node::Text(t));
            }
        }
        el => out.push(el),
    }
}

/// Split a node list at a UTF-16 text offset.
///
/// Elements straddling the offset are cloned onto both sides, the same way a DOM
/// range extraction leaves a partial ancestor behind. Zero-length nodes sitting on
/// the boundary stay on the left.
pub(crate) fn split_nodes(nodes: Vec<Node>, at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut offset = 0;

    for node in nodes {
        let len = node.text_len();
        if offset + len <= at {
            left.push(node);
        } else if offset >= at {
            right.push(node);
        } else {
            match node {
                Node::Text(t) => {
                    let b = utf16_to_byte_idx(&t, (at - offset) as u32);
                    left.push(Node::Text(t[..b].to_string()));
                    right.push(Node::Text(t[b..].to_string()));
                }
                Node::Element(el) => {
                    let shell = el.shell();
                    let (l, r) = split_nodes(el.children, at - offset);
                    left.push(Node::Element(Element {
                        children: l,
                        ..shell.clone()
                    }));
                    right.push(Node::Element(Element {
                        children: r,
                        ..shell
                    }));
                }
            }
        }
        offset += len;
    }

    (left, right)
}

/// Parse an HTML fragment the way `innerHTML` would, tolerating broken markup.
///
/// Rules:
/// - Unclosed elements are closed at the end of input.
/// - A close tag with no matching open element is ignored.
/// - Void elements never take children.
/// - `script`/`style`/`textarea`/`title` (and the other raw-text elements) hold
///   raw text up to their close tag; `plaintext` runs to the end of input.
/// - Elements nested deeper than `MAX_DEPTH` are unwrapped.
pub(crate) fn parse_fragment(input: &str) -> Vec<Node> {
    let mut p = Parser {
        src: input,
        pos: 0,
        root: Vec::new(),
        stack: Vec::new(),
        unwrapped: Vec::new(),
    };
    p.run();
    p.finish()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    root: Vec<Node>,
    stack: Vec<Element>,
    /// Tags dropped by the depth cap, so their close tags are swallowed too.
    unwrapped: Vec<String>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn emit(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(open) => push_node(&mut open.children, node),
            None => push_node(&mut self.root, node),
        }
    }

    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = decode_entities(&rest[..end]);
                self.pos += end;
                self.emit(Node::Text(text));
                continue;
            }

            if rest.starts_with("<!--") {
                self.pos += 4;
                self.skip_past("-->");
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }

            if let Some(after) = rest.strip_prefix("</") {
                let name_len = tag_name_len(after);
                if name_len == 0 {
                    self.skip_past(">");
                    continue;
                }
                let name = after[..name_len].to_ascii_lowercase();
                self.skip_past(">");
                self.close(&name);
                continue;
            }

            let starts_tag = rest[1..]
                .chars()
                .next()
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false);
            if !starts_tag {
                self.pos += 1;
                self.emit(Node::Text("<".to_string()));
                continue;
            }

            self.pos += 1;
            let Some(el) = self.start_tag() else {
                // EOF inside a tag: the partial tag is dropped.
                self.pos = self.src.len();
                break;
            };

            if is_void_tag(&el.tag) {
                self.emit(Node::Element(el));
            } else if RAW_TEXT_TAGS.contains(&el.tag.as_str()) {
                self.raw_text(el);
            } else if self.stack.len() >= MAX_DEPTH {
                self.unwrapped.push(el.tag);
            } else {
                self.stack.push(el);
            }
        }
    }

    /// Parse `name attr=value ...>` after the opening `<`.
    fn start_tag(&mut self) -> Option<Element> {
        let name_len = tag_name_len(self.rest());
        let mut el = Element::new(&self.rest()[..name_len].to_ascii_lowercase());
        self.pos += name_len;

        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
            self.pos += rest.len() - trimmed.len();

            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Some(el);
            }

            let name_end = rest
                .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            let name = rest[..name_end].to_ascii_lowercase();
            self.pos += name_end;

            let rest = self.rest();
            let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
            let mut value = String::new();
            if let Some(after_eq) = trimmed.strip_prefix('=') {
                let after_eq_trimmed = after_eq.trim_start_matches(|c: char| c.is_ascii_whitespace());
                self.pos += rest.len() - after_eq_trimmed.len();
                let v = self.rest();
                if let Some(q) = v.chars().next().filter(|c| *c == '"' || *c == '\'') {
                    let body = &v[1..];
                    let end = body.find(q)?;
                    value = decode_entities(&body[..end]);
                    self.pos += 1 + end + 1;
                } else {
                    let end = v
                        .find(|c: char| c.is_ascii_whitespace() || c == '>')
                        .unwrap_or(v.len());
                    value = decode_entities(&v[..end]);
                    self.pos += end;
                }
            }

            if !name.is_empty() && el.attr(&name).is_none() {
                el.attrs.push((name, value));
            }
        }
    }

    fn raw_text(&mut self, mut el: Element) {
        let close = format!("</{}", el.tag);
        let rest = self.rest();
        let end = if el.tag == "plaintext" {
            rest.len()
        } else {
            rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len())
        };
        let raw = &rest[..end];
        let text = if RCDATA_TAGS.contains(&el.tag.as_str()) {
            decode_entities(raw)
        } else {
            raw.to_string()
        };
        if !text.is_empty() {
            el.children.push(Node::Text(text));
        }
        self.pos += end;
        if self.pos < self.src.len() {
            self.skip_past(">");
        }
        self.emit(Node::Element(el));
    }

    fn close(&mut self, tag: &str) {
        if let Some(i) = self.unwrapped.iter().rposition(|t| t == tag) {
            self.unwrapped.remove(i);
            return;
        }
        let Some(idx) = self.stack.iter().rposition(|e| e.tag == tag) else {
            return;
        };
        while self.stack.len() > idx {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.emit(Node::Element(el));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.root
    }
}

fn tag_name_len(s: &str) -> usize {
    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(s.len())
}

pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').and_then(|semi| {
            let name = &rest[1..1 + semi];
            decode_entity(name).map(|c| (c, semi + 2))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code).filter(|c| *c != '\0')
        }
    }
}

pub(crate) fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for n in nodes {
        write_node(&mut out, n);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => escape_text_into(out, t),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (k, v) in &el.attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                escape_attr_into(out, v);
                out.push('"');
            }
            out.push('>');
            if is_void_tag(&el.tag) {
                return;
            }
            for c in &el.children {
                write_node(out, c);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_text_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, children: Vec<Node>) -> Node {
        Node::Element(Element {
            children,
            ..Element::new(tag)
        })
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse_fragment(r#"a<span style="color: red" class=x>b<em>c</em></span>"#);
        assert_eq!(nodes.len(), 2);
        let Node::Element(span) = &nodes[1] else {
            panic!("expected span");
        };
        assert_eq!(span.tag, "span");
        assert_eq!(span.attr("style"), Some("color: red"));
        assert_eq!(span.attr("class"), Some("x"));
        assert_eq!(span.children, vec![text("b"), el("em", vec![text("c")])]);
    }

    #[test]
    fn closes_unclosed_and_ignores_stray_close_tags() {
        let nodes = parse_fragment("<b>bold</i> still");
        assert_eq!(nodes, vec![el("b", vec![text("bold still")])]);
    }

    #[test]
    fn close_tag_pops_intermediate_elements() {
        let nodes = parse_fragment("<span><em>x</span>y");
        assert_eq!(
            nodes,
            vec![el("span", vec![el("em", vec![text("x")])]), text("y")]
        );
    }

    #[test]
    fn void_elements_take_no_children() {
        let nodes = parse_fragment("a<br>b<br/>c");
        assert_eq!(
            nodes,
            vec![text("a"), el("br", vec![]), text("b"), el("br", vec![]), text("c")]
        );
    }

    #[test]
    fn script_content_is_raw_text() {
        let nodes = parse_fragment("<script>if (a<b) x()</script>z");
        assert_eq!(
            nodes,
            vec![el("script", vec![text("if (a<b) x()")]), text("z")]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(parse_fragment("a<!-- hidden -->b"), vec![text("ab")]);
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;&nbsp;"), "a & b <c> AB\u{a0}");
        assert_eq!(decode_entities("fish & chips &bogus;"), "fish & chips &bogus;");
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let nodes = vec![
            Node::Element(Element {
                children: vec![text("1 < 2 & 3\u{a0}")],
                ..Element::new("span").with_attr("style", "font-family: \"x\"")
            }),
            el("br", vec![]),
        ];
        assert_eq!(
            serialize(&nodes),
            r#"<span style="font-family: &quot;x&quot;">1 &lt; 2 &amp; 3&nbsp;</span><br>"#
        );
    }

    #[test]
    fn text_length_counts_utf16_units() {
        let nodes = parse_fragment("a<b>😀</b>é");
        assert_eq!(text_len_utf16(&nodes), 4);
        assert_eq!(text_content(&nodes), "a😀é");
    }

    #[test]
    fn split_clones_straddling_elements() {
        let nodes = parse_fragment("ab<em>cd</em>ef");
        let (l, r) = split_nodes(nodes, 3);
        assert_eq!(serialize(&l), "ab<em>c</em>");
        assert_eq!(serialize(&r), "<em>d</em>ef");
    }

    fn depth(nodes: &[Node]) -> usize {
        let mut max = 0;
        let mut level: Vec<(&[Node], usize)> = vec![(nodes, 0)];
        while let Some((ns, d)) = level.pop() {
            max = max.max(d);
            for n in ns {
                if let Node::Element(e) = n {
                    level.push((e.children.as_slice(), d + 1));
                }
            }
        }
        max
    }

    #[test]
    fn nesting_is_capped_and_text_survives() {
        let input = "<span>".repeat(100_000) + "x";
        let nodes = parse_fragment(&input);
        assert_eq!(depth(&nodes), MAX_DEPTH);
        assert_eq!(text_content(&nodes), "x");
    }

    #[test]
    fn close_tags_of_unwrapped_elements_are_swallowed() {
        let input = format!(
            "{}<em>deep</em>{}after",
            "<span>".repeat(MAX_DEPTH),
            "</span>".repeat(MAX_DEPTH)
        );
        let nodes = parse_fragment(&input);
        assert_eq!(depth(&nodes), MAX_DEPTH);
        assert_eq!(text_content(&nodes), "deepafter");
        assert!(matches!(nodes.last(), Some(Node::Text(t)) if t == "after"));
    }

    #[test]
    fn legacy_raw_text_elements_are_not_tokenized() {
        let nodes = parse_fragment("<xmp><b>&amp;</b></xmp>z");
        assert_eq!(nodes[0], el("xmp", vec![text("<b>&amp;</b>")]));
        assert_eq!(nodes[1], text("z"));

        let nodes = parse_fragment("a<plaintext></plaintext><i>");
        assert_eq!(nodes[1], el("plaintext", vec![text("</plaintext><i>")]));
    }
}
