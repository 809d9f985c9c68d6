//! Placeholder capabilities and discovery on an instantiated slide.
//!
//! [`Capability::from_ph_type`] is the only place raw `p:ph@type` codes are
//! interpreted. Handles returned here are positions in the shape tree and
//! stay valid until the tree is next modified.

use crate::template::{shape_bounds, LayoutHandle};
use crate::xml::{Element, Node};
use deck_core::Rect;

/// What content a placeholder can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Title,
    /// Body, object and content placeholders.
    Body,
    Picture,
}

impl Capability {
    /// Interpret a raw placeholder type. An absent type is the schema
    /// default `obj`. Footer-like types have no capability.
    pub fn from_ph_type(ph_type: Option<&str>) -> Option<Self> {
        match ph_type.unwrap_or("obj") {
            "title" | "ctrTitle" => Some(Capability::Title),
            "pic" => Some(Capability::Picture),
            "body" | "obj" | "subTitle" => Some(Capability::Body),
            _ => None,
        }
    }
}

/// A shape in a slide's `p:spTree` selected to receive content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRef {
    /// Node position within `p:spTree`.
    pub index: usize,
    pub capability: Capability,
    pub ph_type: Option<String>,
    pub idx: Option<String>,
    /// False for a plain text shape used as a body.
    pub is_placeholder: bool,
}

/// Raw `(type, idx)` of a shape's `p:ph`, if it has one.
fn ph_of(shape: &Element) -> Option<(Option<&str>, Option<&str>)> {
    let nv = shape.child("nvSpPr").or_else(|| shape.child("nvPicPr"))?;
    let ph = nv.find(&["nvPr", "ph"])?;
    Some((ph.attr("type"), ph.attr("idx")))
}

fn shapes(tree: &Element) -> impl Iterator<Item = (usize, &Element)> {
    tree.children.iter().enumerate().filter_map(|(i, n)| match n {
        Node::Element(el) if el.is("sp") || el.is("pic") => Some((i, el)),
        _ => None,
    })
}

/// Every placeholder with a capability, in document order.
pub fn placeholders(tree: &Element) -> Vec<PlaceholderRef> {
    shapes(tree)
        .filter_map(|(index, shape)| {
            let (ph_type, idx) = ph_of(shape)?;
            Some(PlaceholderRef {
                index,
                capability: Capability::from_ph_type(ph_type)?,
                ph_type: ph_type.map(str::to_string),
                idx: idx.map(str::to_string),
                is_placeholder: true,
            })
        })
        .collect()
}

fn first_with(tree: &Element, capability: Capability) -> Option<PlaceholderRef> {
    placeholders(tree)
        .into_iter()
        .find(|p| p.capability == capability)
}

/// The title placeholder.
pub fn find_title(tree: &Element) -> Option<PlaceholderRef> {
    first_with(tree, Capability::Title)
}

pub fn find_picture(tree: &Element) -> Option<PlaceholderRef> {
    first_with(tree, Capability::Picture)
}

fn text_shape_ref(index: usize, shape: &Element) -> PlaceholderRef {
    let ph = ph_of(shape);
    PlaceholderRef {
        index,
        capability: Capability::Body,
        ph_type: ph.and_then(|(t, _)| t).map(str::to_string),
        idx: ph.and_then(|(_, i)| i).map(str::to_string),
        is_placeholder: ph.is_some(),
    }
}

fn is_title_shape(shape: &Element) -> bool {
    matches!(ph_of(shape), Some((ph_type, _)) if Capability::from_ph_type(ph_type) == Some(Capability::Title))
}

/// The body target: the first body placeholder, else the first non-title
/// shape with a text body.
pub fn find_body(tree: &Element) -> Option<PlaceholderRef> {
    first_with(tree, Capability::Body).or_else(|| {
        shapes(tree)
            .find(|(_, shape)| shape.child("txBody").is_some() && !is_title_shape(shape))
            .map(|(index, shape)| text_shape_ref(index, shape))
    })
}

/// The quote target: the first shape with a text body that is neither the
/// title nor a footer-like placeholder.
pub fn find_quote_body(tree: &Element) -> Option<PlaceholderRef> {
    shapes(tree)
        .find(|(_, shape)| {
            let accepts = match ph_of(shape) {
                Some((ph_type, _)) => Capability::from_ph_type(ph_type) == Some(Capability::Body),
                None => true,
            };
            accepts && shape.child("txBody").is_some()
        })
        .map(|(index, shape)| text_shape_ref(index, shape))
}

/// Up to three title or body placeholders for the deck title slide.
pub fn title_slide_targets(tree: &Element) -> Vec<PlaceholderRef> {
    placeholders(tree)
        .into_iter()
        .filter(|p| matches!(p.capability, Capability::Title | Capability::Body))
        .take(3)
        .collect()
}

/// Resolve a handle to its shape.
pub fn shape_at<'a>(tree: &'a Element, target: &PlaceholderRef) -> Option<&'a Element> {
    match tree.children.get(target.index) {
        Some(Node::Element(el)) => Some(el),
        _ => None,
    }
}

pub fn shape_at_mut<'a>(tree: &'a mut Element, target: &PlaceholderRef) -> Option<&'a mut Element> {
    match tree.children.get_mut(target.index) {
        Some(Node::Element(el)) => Some(el),
        _ => None,
    }
}

/// Whether a shape carries no visible text.
pub fn is_text_empty(shape: &Element) -> bool {
    shape
        .child("txBody")
        .map(|body| body.descendants("t").iter().all(|t| t.text().trim().is_empty()))
        .unwrap_or(true)
}

/// Effective bounds of a shape: its own `a:xfrm`, else the layout's, else
/// the master's.
pub fn effective_bounds(tree: &Element, target: &PlaceholderRef, layout: &LayoutHandle) -> Option<Rect> {
    let shape = shape_at(tree, target)?;
    shape_bounds(shape).or_else(|| {
        if target.is_placeholder {
            layout.inherited_bounds(target.ph_type.as_deref(), target.idx.as_deref())
        } else {
            None
        }
    })
}
