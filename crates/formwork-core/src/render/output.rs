//! Rendered interface tree
//!
//! Renderers produce [`Output`], a small element tree that hosts can walk
//! directly or serialize with [`Output::to_html`] / [`Output::to_text`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Why a node rendered as a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderReason {
    /// No renderer is registered for the type
    NotRegistered,
    /// The node is nested deeper than the configured limit
    DepthExceeded,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    #[default]
    Empty,
    Text {
        text: String,
    },
    Element(Element),
    Fragment {
        children: Vec<Output>,
    },
    Placeholder {
        type_name: String,
        reason: PlaceholderReason,
    },
    Error {
        type_name: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Element {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Output>,
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

const BLOCK_TAGS: &[&str] = &[
    "article", "div", "fieldset", "footer", "form", "h1", "h2", "h3", "h4", "header", "legend",
    "li", "main", "p", "section", "table", "tr", "ul",
];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Append a class, keeping any existing ones
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref().trim();
        if class.is_empty() {
            return self;
        }
        self.class_name = Some(match self.class_name.take() {
            Some(existing) => format!("{} {}", existing, class),
            None => class.to_string(),
        });
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: Output) -> Self {
        if child != Output::Empty {
            self.children.push(child);
        }
        self
    }

    pub fn children<I: IntoIterator<Item = Output>>(mut self, children: I) -> Self {
        for child in children {
            self = self.child(child);
        }
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Output::text(text))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name
            .as_deref()
            .is_some_and(|names| names.split_whitespace().any(|c| c == class))
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn into_output(self) -> Output {
        Output::Element(self)
    }
}

impl From<Element> for Output {
    fn from(element: Element) -> Self {
        Output::Element(element)
    }
}

impl Output {
    pub fn text(text: impl Into<String>) -> Self {
        Output::Text { text: text.into() }
    }

    pub fn fragment(children: Vec<Output>) -> Self {
        Output::Fragment { children }
    }

    pub fn placeholder(type_name: impl Into<String>, reason: PlaceholderReason) -> Self {
        Output::Placeholder {
            type_name: type_name.into(),
            reason,
        }
    }

    pub fn error(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Output::Error {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Output::Error { .. })
    }

    fn children(&self) -> &[Output] {
        match self {
            Output::Element(el) => &el.children,
            Output::Fragment { children } => children,
            _ => &[],
        }
    }

    /// Depth-first walk over every output in the tree, self included
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Output)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn find_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.walk(&mut |output| {
            if let Output::Element(el) = output {
                if el.has_class(class) {
                    found.push(el);
                }
            }
        });
        found
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.walk(&mut |output| {
            if let Output::Element(el) = output {
                if el.tag == tag {
                    found.push(el);
                }
            }
        });
        found
    }

    /// Every `(type, message)` of the error outputs in the tree
    pub fn errors(&self) -> Vec<(&str, &str)> {
        let mut found = Vec::new();
        self.walk(&mut |output| {
            if let Output::Error { type_name, message } = output {
                found.push((type_name.as_str(), message.as_str()));
            }
        });
        found
    }

    /// Every type name rendered as a placeholder
    pub fn placeholders(&self) -> Vec<(&str, PlaceholderReason)> {
        let mut found = Vec::new();
        self.walk(&mut |output| {
            if let Output::Placeholder { type_name, reason } = output {
                found.push((type_name.as_str(), *reason));
            }
        });
        found
    }

    /// Concatenated text leaves, without any separators
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |output| {
            if let Output::Text { text } = output {
                out.push_str(text);
            }
        });
        out
    }

    /// Serialize as escaped HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Output::Empty => {}
            Output::Text { text } => out.push_str(&escape(text)),
            Output::Fragment { children } => {
                for child in children {
                    child.write_html(out);
                }
            }
            Output::Element(el) => {
                let _ = write!(out, "<{}", el.tag);
                if let Some(class) = &el.class_name {
                    let _ = write!(out, " class=\"{}\"", escape(class));
                }
                for (name, value) in &el.attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                out.push('>');
                if VOID_TAGS.contains(&el.tag.as_str()) {
                    return;
                }
                for child in &el.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
            Output::Placeholder { type_name, reason } => {
                let _ = write!(
                    out,
                    "<div class=\"formwork-placeholder\" data-type=\"{}\">{}</div>",
                    escape(type_name),
                    escape(&placeholder_message(type_name, *reason))
                );
            }
            Output::Error { type_name, message } => {
                let _ = write!(
                    out,
                    "<div class=\"formwork-error\" data-type=\"{}\" role=\"alert\">{}</div>",
                    escape(type_name),
                    escape(message)
                );
            }
        }
    }

    /// Serialize as plain text, one block element per line
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out.lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Output::Empty => {}
            Output::Text { text } => out.push_str(text),
            Output::Fragment { children } => {
                for child in children {
                    child.write_text(out);
                }
            }
            Output::Element(el) => {
                let block = BLOCK_TAGS.contains(&el.tag.as_str());
                if block {
                    out.push('\n');
                }
                if el.tag == "img" {
                    if let Some(alt) = el.attr_value("alt") {
                        let _ = write!(out, "[image: {}]", alt);
                    }
                }
                for child in &el.children {
                    child.write_text(out);
                }
                match el.tag.as_str() {
                    "td" | "th" => out.push('\t'),
                    _ if block => out.push('\n'),
                    _ => {}
                }
            }
            Output::Placeholder { type_name, reason } => {
                let _ = write!(out, "\n[{}]\n", placeholder_message(type_name, *reason));
            }
            Output::Error { type_name, message } => {
                let _ = write!(out, "\n[error in {}: {}]\n", type_name, message);
            }
        }
    }
}

fn placeholder_message(type_name: &str, reason: PlaceholderReason) -> String {
    match reason {
        PlaceholderReason::NotRegistered => format!("Unknown component: {}", type_name),
        PlaceholderReason::DepthExceeded => {
            format!("Maximum render depth exceeded at {}", type_name)
        }
    }
}

/// Escape text for use in HTML content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Output {
        Element::new("section")
            .class("card")
            .attr("data-id", "1")
            .child(Element::new("h2").text("Title <b>").into())
            .child(Output::Empty)
            .child(
                Element::new("img")
                    .attr("src", "/a.png")
                    .attr("alt", "A")
                    .into(),
            )
            .child(Output::error("grid", "boom"))
            .into()
    }

    #[test]
    fn test_html_escapes_and_skips_void_closers() {
        assert_eq!(
            sample().to_html(),
            "<section class=\"card\" data-id=\"1\"><h2>Title &lt;b&gt;</h2>\
             <img alt=\"A\" src=\"/a.png\">\
             <div class=\"formwork-error\" data-type=\"grid\" role=\"alert\">boom</div></section>"
        );
    }

    #[test]
    fn test_text_puts_blocks_on_lines() {
        assert_eq!(
            sample().to_text(),
            "Title <b>\n[image: A]\n[error in grid: boom]"
        );
    }

    #[test]
    fn test_queries_over_tree() {
        let out = sample();
        assert_eq!(out.find_by_class("card").len(), 1);
        assert_eq!(out.find_by_tag("img").len(), 1);
        assert_eq!(out.errors(), vec![("grid", "boom")]);
        assert_eq!(out.text_content(), "Title <b>");
        // Empty children are dropped by the builder
        if let Output::Element(el) = &out {
            assert_eq!(el.children.len(), 3);
        }
    }

    #[test]
    fn test_class_builder_appends() {
        let el = Element::new("div").class("a").class("  ").class("b");
        assert_eq!(el.class_name.as_deref(), Some("a b"));
        assert!(el.has_class("b"));
        assert!(!el.has_class("c"));
    }

    #[test]
    fn test_placeholder_serialization() {
        let out = Output::placeholder("ui:badge", PlaceholderReason::NotRegistered);
        assert!(out.to_html().contains("Unknown component: ui:badge"));
        assert_eq!(out.to_text(), "[Unknown component: ui:badge]");
        assert_eq!(out.placeholders(), vec![("ui:badge", PlaceholderReason::NotRegistered)]);
    }
}
