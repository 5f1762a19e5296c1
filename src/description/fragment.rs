//! Owned HTML fragment tree
//!
//! Descriptions are parsed once with `scraper` and copied into this small
//! owned tree. Every rewrite in this module produces a new `Fragment`, so
//! the processing steps stay pure and can be tested in isolation.

use scraper::{ElementRef, Html};

/// Elements that never have children or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is serialized without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// A node of a description fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with its attributes in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing value
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Adds a class token, keeping the existing ones
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", &classes);
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl Node {
    /// Serializes this node as HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out, false);
        out
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// The contents of a description container
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Parses an HTML snippet
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_fragment(html);
        Self::from_element(document.root_element())
    }

    /// Copies the contents (not the element itself) of a parsed element
    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self::new(convert_children(element))
    }

    /// Serializes the fragment's children as HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out, false);
        }
        out
    }

    /// UTF-8 length of the serialized fragment
    pub fn byte_len(&self) -> usize {
        self.to_html().len()
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Path of the first element (in document order) matching `predicate`
    ///
    /// A path lists child indexes from the fragment root down to the element.
    pub fn find_element<P>(&self, predicate: P) -> Option<Vec<usize>>
    where
        P: Fn(&Element) -> bool,
    {
        let mut path = Vec::new();
        let found = find_in(&self.children, &mut path, &predicate);
        found.then_some(path)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &index in rest {
            node = match node {
                Node::Element(el) => el.children.get(index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        self.node_at(path).and_then(Node::as_element)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for &index in rest {
            node = match node {
                Node::Element(el) => el.children.get_mut(index)?,
                _ => return None,
            };
        }
        match node {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

fn convert_children(element: ElementRef<'_>) -> Vec<Node> {
    element
        .children()
        .filter_map(|child| match child.value() {
            scraper::Node::Text(text) => Some(Node::Text(String::from(&**text))),
            scraper::Node::Comment(comment) => Some(Node::Comment(String::from(&**comment))),
            scraper::Node::Element(_) => ElementRef::wrap(child).map(convert_element),
            _ => None,
        })
        .collect()
}

fn convert_element(element: ElementRef<'_>) -> Node {
    let value = element.value();
    Node::Element(Element {
        name: value.name().to_string(),
        attrs: value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        children: convert_children(element),
    })
}

fn find_in<P>(nodes: &[Node], path: &mut Vec<usize>, predicate: &P) -> bool
where
    P: Fn(&Element) -> bool,
{
    for (index, node) in nodes.iter().enumerate() {
        if let Node::Element(el) = node {
            path.push(index);
            if predicate(el) || find_in(&el.children, path, predicate) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Comment(_) => {}
        }
    }
}

fn write_node(node: &Node, out: &mut String, raw_text: bool) {
    match node {
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => escape_into(text, out, false),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, out, true);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }

            let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
            for child in &el.children {
                write_node(child, out, raw);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, out: &mut String, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
