//! Ordered XML element tree built on quick-xml events.
//!
//! Package parts are edited structurally: parsed into an [`XmlDocument`],
//! modified through [`Element`], and serialized back. Element and attribute
//! order is preserved so untouched content round-trips unchanged.

use deck_core::{Error, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Namespace of DrawingML (`a:`).
pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// Namespace of PresentationML (`p:`).
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
/// Namespace of officeDocument relationships (`r:`).
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A child node of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    /// Raw comment content, kept escaped.
    Comment(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Qualified name as written, e.g. `p:sp`.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// The `<?xml ...?>` declaration of a part.
#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    declaration: Option<Declaration>,
    pub root: Element,
}

/// Local part of a possibly prefixed name.
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn xml_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::XmlError(format!("{}: {}", context, e))
}

impl XmlDocument {
    /// A document with the standalone UTF-8 declaration Office writes.
    pub fn new(root: Element) -> Self {
        Self {
            declaration: Some(Declaration {
                version: "1.0".to_string(),
                encoding: Some("UTF-8".to_string()),
                standalone: Some("yes".to_string()),
            }),
            root,
        }
    }

    /// Parse a part from bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut declaration = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Decl(ref d)) => {
                    let version = d
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let encoding = d
                        .encoding()
                        .and_then(|e| e.ok())
                        .map(|e| String::from_utf8_lossy(&e).into_owned());
                    let standalone = d
                        .standalone()
                        .and_then(|s| s.ok())
                        .map(|s| String::from_utf8_lossy(&s).into_owned());
                    declaration = Some(Declaration {
                        version,
                        encoding,
                        standalone,
                    });
                }
                Ok(Event::Start(ref e)) => {
                    stack.push(element_from_start(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = element_from_start(e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::XmlError("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| xml_err("bad text", e))?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                        parent.children.push(Node::CData(text));
                    }
                }
                Ok(Event::Comment(ref t)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::Comment(String::from_utf8_lossy(t).into_owned()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(xml_err(
                        &format!("parse error at byte {}", reader.buffer_position()),
                        e,
                    ))
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::XmlError("unclosed element at end of part".to_string()));
        }
        let root = root.ok_or_else(|| Error::XmlError("part has no root element".to_string()))?;
        Ok(Self { declaration, root })
    }

    /// Serialize back to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(|e| xml_err("write declaration", e))?;
            writer
                .write_event(Event::Text(BytesText::from_escaped("\r\n")))
                .map_err(|e| xml_err("write declaration", e))?;
        }
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn element_from_start(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_err("bad attribute", err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_err("bad attribute value", err))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| xml_err("write element", e));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| xml_err("write element", e))?;
    for child in &element.children {
        match child {
            Node::Element(el) => write_element(writer, el)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| xml_err("write text", e))?,
            Node::CData(text) => writer
                .write_event(Event::CData(BytesCData::new(text.as_str())))
                .map_err(|e| xml_err("write cdata", e))?,
            Node::Comment(text) => writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(|e| xml_err("write comment", e))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| xml_err("write element", e))
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Append a text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether the local name equals `local`.
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute by qualified name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute, keeping its position when replaced.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attrs.retain(|(k, _)| k != key);
    }

    /// Integer attribute, `None` when absent or malformed.
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(|v| v.trim().parse().ok())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with local name `local`.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.is(local))
    }

    /// All child elements with local name `local`.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |el| el.is(local))
    }

    /// Follow a path of local names through first matching children.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// Descendants with local name `local`, in document order.
    pub fn descendants<'a>(&'a self, local: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_descendants(self, local, &mut found);
        found
    }

    /// Apply `f` to every descendant with local name `local`, outermost first.
    pub fn visit_mut(&mut self, local: &str, f: &mut impl FnMut(&mut Element)) {
        for child in self.elements_mut() {
            if child.is(local) {
                f(child);
            }
            child.visit_mut(local, f);
        }
    }

    /// Concatenated text content of the subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Insert a child at node position `index` (clamped to the end).
    pub fn insert(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    /// Node position of the first child element with local name `local`.
    pub fn position(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, Node::Element(el) if el.is(local)))
    }

    /// Remove every child element matching `pred`, returning how many went.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Element) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, Node::Element(el) if pred(el)));
        before - self.children.len()
    }

    /// Get the child named `name`, creating it at the end when missing.
    pub fn ensure_child(&mut self, name: &str) -> &mut Element {
        let local = local_name(name).to_string();
        let index = match self.position(&local) {
            Some(index) => index,
            None => {
                self.push(Element::new(name));
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            Node::Element(el) => el,
            _ => unreachable!("position() only returns element nodes"),
        }
    }
}

fn collect_descendants<'a>(element: &'a Element, local: &str, found: &mut Vec<&'a Element>) {
    for child in element.elements() {
        if child.is(local) {
            found.push(child);
        }
        collect_descendants(child, local, found);
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Element(el) => collect_text(el, out),
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Comment(_) => {}
        }
    }
}
