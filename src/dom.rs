//! Markup reader for template fragments.
//!
//! Templates emit a small HTML vocabulary (div, p, h1-h3, ul, li, span, img)
//! styled purely through `class`. Anything else is kept and laid out as a div.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    Ul,
    Li,
    Span,
    Img,
    Body,
    Html,
    Head,
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" | "section" | "header" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "li" => Tag::Li,
            "span" => Tag::Span,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            _ => Tag::Unknown(s.to_string()),
        }
    }

    /// Elements that never carry children.
    fn is_void(&self) -> bool {
        matches!(self, Tag::Img)
    }
}

#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }

    /// Concatenated text of every descendant.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Parse a fragment into a list of top-level nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    Parser { input: html, pos: 0 }.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_interelement_whitespace();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past(">");
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        let end = self.input[start..]
            .find('<')
            .map(|i| start + i)
            .unwrap_or(self.input.len());
        self.pos = end;
        DomNode::Text(decode_entities(&self.input[start..end]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.pos += 1; // '<'
        let tag = Tag::from_name(&self.parse_name());
        let mut elem = ElementNode::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Stray character inside a tag; step over it.
                self.bump();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        elem.children = self.parse_nodes();

        if self.starts_with("</") {
            self.pos += 2;
            self.parse_name();
            self.skip_past(">");
        }

        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                let end = self.input[start..]
                    .find(q)
                    .map(|i| start + i)
                    .unwrap_or(self.input.len());
                self.pos = (end + 1).min(self.input.len());
                decode_entities(&self.input[start..end])
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || c == '/' {
                        break;
                    }
                    self.bump();
                }
                self.input[start..self.pos].to_string()
            }
        };
        (key, value)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Whitespace-only runs between tags are dropped; whitespace leading into
    /// text is part of that text.
    fn skip_interelement_whitespace(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_past(&mut self, marker: &str) {
        match self.input[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }
}

/// Single-pass entity decoding, so `&amp;lt;` stays `&lt;`.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    const ENTITIES: [(&str, &str); 8] = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#34;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", "\u{00A0}"),
    ];
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match ENTITIES.iter().find(|(ent, _)| rest.starts_with(ent)) {
            Some((ent, ch)) => {
                out.push_str(ch);
                rest = &rest[ent.len()..];
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

/// Inverse of [`decode_entities`] for text interpolated into templates.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Children of `<body>` if present, otherwise the nodes themselves.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(html: &str) -> ElementNode {
        match parse_html(html).into_iter().next() {
            Some(DomNode::Element(e)) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn parses_classes_and_children() {
        let e = first_element(r#"<div class="mb-4 flex"><h3>Creative Director</h3><p>Uber</p></div>"#);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["mb-4", "flex"]);
        assert_eq!(e.children.len(), 2);
    }

    #[test]
    fn img_is_void_even_without_slash() {
        let nodes = parse_html(r#"<img src="data:image/png;base64,AAAA" class="w-24"><p>after</p>"#);
        assert_eq!(nodes.len(), 2);
        if let DomNode::Element(img) = &nodes[0] {
            assert_eq!(img.tag, Tag::Img);
            assert_eq!(img.src(), Some("data:image/png;base64,AAAA"));
        }
    }

    #[test]
    fn escaped_user_text_survives_round_trip() {
        let raw = r#"R&D <lead> "quoted" & 'single'"#;
        let e = first_element(&format!("<p>{}</p>", escape_html(raw)));
        assert_eq!(e.text_content(), raw);
    }

    #[test]
    fn decoding_is_single_pass() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("a & b"), "a & b");
    }

    #[test]
    fn inline_span_keeps_text_order() {
        let e = first_element(r#"<p>Sep 2018 <span class="font-bold">-</span> Jan 2020</p>"#);
        assert_eq!(e.children.len(), 3);
        assert_eq!(e.text_content(), "Sep 2018 - Jan 2020");
    }
}
