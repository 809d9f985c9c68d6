//! Slide instantiation from a layout and slide part bookkeeping.

use crate::content_types::types;
use crate::package::Package;
use crate::placeholder::Capability;
use crate::relationships::{rel_types, relative_target, Relationships};
use crate::template::{InheritedPlaceholder, LayoutHandle, PRESENTATION_PART};
use crate::xml::{Element, Node, XmlDocument, NS_A, NS_P, NS_R};
use deck_core::{Error, Result};

/// Lowest id PowerPoint accepts in `p:sldIdLst`.
const MIN_SLIDE_ID: i64 = 256;

/// Elements of `p:presentation` that precede `p:sldIdLst`.
const BEFORE_SLIDE_LIST: [&str; 3] = ["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];

/// A slide being populated. Changes reach the package on [`SlidePart::save`].
#[derive(Debug, Clone)]
pub struct SlidePart {
    pub part_name: String,
    pub doc: XmlDocument,
    pub rels: Relationships,
    pub layout: LayoutHandle,
}

impl SlidePart {
    pub fn sp_tree(&self) -> Result<&Element> {
        self.doc
            .root
            .find(&["cSld", "spTree"])
            .ok_or_else(|| Error::CorruptedFile(format!("{} has no shape tree", self.part_name)))
    }

    pub fn sp_tree_mut(&mut self) -> Result<&mut Element> {
        let part_name = &self.part_name;
        self.doc
            .root
            .find_mut(&["cSld", "spTree"])
            .ok_or_else(|| Error::CorruptedFile(format!("{} has no shape tree", part_name)))
    }

    /// One above the largest `cNvPr@id` on the slide.
    pub fn next_shape_id(&self) -> i64 {
        self.doc
            .root
            .descendants("cNvPr")
            .iter()
            .filter_map(|c| c.attr_i64("id"))
            .max()
            .unwrap_or(1)
            + 1
    }

    /// Write the slide and its relationships into the package.
    pub fn save(&self, package: &mut Package) -> Result<()> {
        package.set_xml(&self.part_name, &self.doc)?;
        package.set_relationships(&self.part_name, &self.rels)
    }
}

/// Clone of a layout placeholder as a slide shape: geometry and formatting
/// are left to inheritance.
fn placeholder_shape(id: i64, source: &InheritedPlaceholder, capability: Capability) -> Element {
    let mut ph = Element::new("p:ph");
    for (key, value) in [
        ("type", &source.ph_type),
        ("orient", &source.orient),
        ("sz", &source.sz),
        ("idx", &source.idx),
    ] {
        if let Some(value) = value {
            ph.set_attr(key, value.as_str());
        }
    }

    let nv_sp_pr = Element::new("p:nvSpPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", source.name.as_str()),
        )
        .with_child(Element::new("p:cNvSpPr").with_child(Element::new("a:spLocks").with_attr("noGrp", "1")))
        .with_child(Element::new("p:nvPr").with_child(ph));

    let mut sp = Element::new("p:sp")
        .with_child(nv_sp_pr)
        .with_child(Element::new("p:spPr"));
    if capability != Capability::Picture {
        sp.push(
            Element::new("p:txBody")
                .with_child(Element::new("a:bodyPr"))
                .with_child(Element::new("a:lstStyle"))
                .with_child(Element::new("a:p")),
        );
    }
    sp
}

fn group_transform() -> Element {
    let point = |name: &str, a: &str, b: &str| Element::new(name).with_attr(a, "0").with_attr(b, "0");
    Element::new("a:xfrm")
        .with_child(point("a:off", "x", "y"))
        .with_child(point("a:ext", "cx", "cy"))
        .with_child(point("a:chOff", "x", "y"))
        .with_child(point("a:chExt", "cx", "cy"))
}

/// Slide XML with one shape per content-capable layout placeholder.
fn slide_document(layout: &LayoutHandle) -> XmlDocument {
    let mut tree = Element::new("p:spTree")
        .with_child(
            Element::new("p:nvGrpSpPr")
                .with_child(Element::new("p:cNvPr").with_attr("id", "1").with_attr("name", ""))
                .with_child(Element::new("p:cNvGrpSpPr"))
                .with_child(Element::new("p:nvPr")),
        )
        .with_child(Element::new("p:grpSpPr").with_child(group_transform()));

    let mut next_id = 2;
    for source in &layout.placeholders {
        if let Some(capability) = Capability::from_ph_type(source.ph_type.as_deref()) {
            tree.push(placeholder_shape(next_id, source, capability));
            next_id += 1;
        }
    }

    let root = Element::new("p:sld")
        .with_attr("xmlns:a", NS_A)
        .with_attr("xmlns:r", NS_R)
        .with_attr("xmlns:p", NS_P)
        .with_child(Element::new("p:cSld").with_child(tree))
        .with_child(Element::new("p:clrMapOvr").with_child(Element::new("a:masterClrMapping")));
    XmlDocument::new(root)
}

/// Append a new slide built from `layout` to the presentation.
///
/// The slide part, its layout relationship, its content-type override and
/// its `p:sldIdLst` entry are all written before returning.
pub fn add_slide(package: &mut Package, layout: &LayoutHandle) -> Result<SlidePart> {
    let part_name = package.next_part_name("ppt/slides/slide", ".xml");

    let mut rels = Relationships::new();
    rels.add(rel_types::SLIDE_LAYOUT, &relative_target(&part_name, &layout.part_name));

    let slide = SlidePart {
        part_name,
        doc: slide_document(layout),
        rels,
        layout: layout.clone(),
    };
    slide.save(package)?;

    let mut content_types = package.content_types()?;
    content_types.set_override(&slide.part_name, types::SLIDE);
    package.set_content_types(&content_types)?;

    let mut presentation_rels = package.relationships(PRESENTATION_PART)?;
    let rid = presentation_rels.add(rel_types::SLIDE, &relative_target(PRESENTATION_PART, &slide.part_name));
    package.set_relationships(PRESENTATION_PART, &presentation_rels)?;

    let mut presentation = package.xml(PRESENTATION_PART)?;
    append_slide_id(&mut presentation.root, &rid);
    package.set_xml(PRESENTATION_PART, &presentation)?;

    log::debug!("Added {} from layout '{}'", slide.part_name, layout.name);
    Ok(slide)
}

/// Append `<p:sldId id=".." r:id=".."/>`, creating the list in schema
/// position when missing.
fn append_slide_id(presentation: &mut Element, rid: &str) {
    if presentation.child("sldIdLst").is_none() {
        let index = presentation
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(el) if BEFORE_SLIDE_LIST.contains(&el.local_name())))
            .map(|i| i + 1)
            .unwrap_or(0);
        presentation.insert(index, Element::new("p:sldIdLst"));
    }

    let Some(list) = presentation.child_mut("sldIdLst") else {
        return;
    };
    let next_id = list
        .children_named("sldId")
        .filter_map(|s| s.attr_i64("id"))
        .max()
        .map(|max| max + 1)
        .unwrap_or(MIN_SLIDE_ID)
        .max(MIN_SLIDE_ID);
    list.push(
        Element::new("p:sldId")
            .with_attr("id", next_id.to_string())
            .with_attr("r:id", rid),
    );
}
