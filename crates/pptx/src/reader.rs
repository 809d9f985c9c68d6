//! Read-back parser for generated packages.

use crate::package::Package;
use crate::relationships::{rel_types, resolve_target};
use crate::template::{shape_bounds, PRESENTATION_PART};
use crate::xml::Element;
use deck_core::{ExtractedParagraph, ExtractedShape, ExtractedSlide, Presentation, Result};
use std::io::{Read, Seek};
use std::path::Path;

/// Parser for PPTX (Office Open XML) files.
pub struct PptxReader;

impl PptxReader {
    /// Create a new PPTX reader.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let package = Package::from_reader(reader)?;
        self.parse_package(&package, filename)
    }

    /// Parse a PPTX file from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Presentation> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let package = Package::open(path)?;
        self.parse_package(&package, &filename)
    }

    /// Parse an in-memory package.
    pub fn parse_package(&self, package: &Package, filename: &str) -> Result<Presentation> {
        let mut presentation = Presentation::new(filename);
        for (idx, slide_path) in slide_parts(package)?.iter().enumerate() {
            let slide = self.parse_slide(package, slide_path, idx + 1)?;
            presentation.add_slide(slide);
        }
        Ok(presentation)
    }

    /// Parse a single slide.
    fn parse_slide(&self, package: &Package, slide_path: &str, slide_number: usize) -> Result<ExtractedSlide> {
        let doc = package.xml(slide_path)?;
        let rels = package.relationships(slide_path)?;
        let mut slide = ExtractedSlide::new(slide_number);

        slide.layout_name = rels
            .first_of_type(rel_types::SLIDE_LAYOUT)
            .map(|rel| resolve_target(slide_path, &rel.target))
            .and_then(|layout_part| package.xml(&layout_part).ok())
            .and_then(|layout| layout.root.find(&["cSld"]).and_then(|c| c.attr("name")).map(str::to_string));

        if let Some(tree) = doc.root.find(&["cSld", "spTree"]) {
            for el in tree.elements().filter(|e| e.is("sp") || e.is("pic")) {
                let mut shape = extract_shape(el);
                if let Some(rid) = el.find(&["blipFill", "blip"]).and_then(|b| b.attr("r:embed")) {
                    shape.image_target = rels.get(rid).map(|rel| resolve_target(slide_path, &rel.target));
                }
                slide.shapes.push(shape);
            }
        }

        Ok(slide)
    }
}

impl Default for PptxReader {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_shape(el: &Element) -> ExtractedShape {
    let nv = el.child("nvSpPr").or_else(|| el.child("nvPicPr"));
    let name = nv
        .and_then(|nv| nv.child("cNvPr"))
        .and_then(|c| c.attr("name"))
        .unwrap_or_default()
        .to_string();
    let placeholder_type = nv
        .and_then(|nv| nv.find(&["nvPr", "ph"]))
        .map(|ph| ph.attr("type").unwrap_or("obj").to_string());

    ExtractedShape {
        name,
        placeholder_type,
        is_picture: el.is("pic"),
        image_target: None,
        bounds: shape_bounds(el).map(|r| (r.x, r.y, r.cx, r.cy)),
        paragraphs: el
            .child("txBody")
            .map(|body| body.children_named("p").map(extract_paragraph).collect())
            .unwrap_or_default(),
    }
}

fn extract_paragraph(p: &Element) -> ExtractedParagraph {
    let ppr = p.child("pPr");
    let runs: Vec<&Element> = p
        .children_named("r")
        .filter(|r| !r.text().is_empty())
        .collect();
    let all_runs = |attr: &str| {
        !runs.is_empty()
            && runs
                .iter()
                .all(|r| r.find(&["rPr"]).and_then(|rpr| rpr.attr(attr)) == Some("1"))
    };

    ExtractedParagraph {
        text: paragraph_text(p),
        level: ppr.and_then(|ppr| ppr.attr_i64("lvl")).unwrap_or(0).clamp(0, 8) as u8,
        bulleted: ppr.and_then(|ppr| ppr.child("buNone")).is_none(),
        italic: all_runs("i"),
        bold: all_runs("b"),
    }
}

/// Visible text of an `a:p`; line breaks read as newlines.
pub fn paragraph_text(p: &Element) -> String {
    let mut text = String::new();
    for child in p.elements() {
        match child.local_name() {
            "r" | "fld" => text.push_str(&child.children_named("t").map(|t| t.text()).collect::<String>()),
            "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Slide part paths in presentation order.
///
/// `p:sldIdLst` decides the order. Slides related to the presentation but
/// missing from the list follow, sorted by the number in their name.
pub fn slide_parts(package: &Package) -> Result<Vec<String>> {
    let presentation = package.xml(PRESENTATION_PART)?;
    let rels = package.relationships(PRESENTATION_PART)?;

    let mut ordered: Vec<String> = presentation
        .root
        .find(&["sldIdLst"])
        .map(|list| {
            list.children_named("sldId")
                .filter_map(|id| id.attr("r:id"))
                .filter_map(|rid| rels.get(rid))
                .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
                .collect()
        })
        .unwrap_or_default();

    let mut unlisted: Vec<String> = rels
        .of_type(rel_types::SLIDE)
        .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
        .filter(|path| !ordered.contains(path))
        .collect();
    unlisted.sort_by_key(|path| (part_number(path).unwrap_or(usize::MAX), path.clone()));
    ordered.extend(unlisted);
    Ok(ordered)
}

/// Number at the end of a part's file stem: `ppt/slides/slide12.xml` is 12.
/// Relationship ids like `rId3` parse the same way.
pub fn part_number(part: &str) -> Option<usize> {
    let file = part.rsplit('/').next()?;
    let stem = file.split('.').next()?;
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    stem[prefix.len()..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    #[test]
    fn test_part_number() {
        assert_eq!(part_number("rId12"), Some(12));
        assert_eq!(part_number("ppt/slides/slide123.xml"), Some(123));
        assert_eq!(part_number("ppt/slides/_rels/slide4.xml.rels"), Some(4));
        assert_eq!(part_number("ppt/slideLayouts/slideLayout10.xml"), Some(10));
        assert_eq!(part_number("ppt/presentation.xml"), None);
    }

    #[test]
    fn test_unlisted_slides_follow_in_number_order() {
        let mut package = crate::testutil::template_package();
        crate::testutil::add_template_slide(&mut package);
        let mut rels = package.relationships(PRESENTATION_PART).unwrap();
        rels.add(rel_types::SLIDE, "slides/slide10.xml");
        rels.add(rel_types::SLIDE, "slides/slide2.xml");
        package.set_relationships(PRESENTATION_PART, &rels).unwrap();

        assert_eq!(
            slide_parts(&package).unwrap(),
            vec!["ppt/slides/slide1.xml", "ppt/slides/slide2.xml", "ppt/slides/slide10.xml"]
        );
    }

    #[test]
    fn test_extract_paragraph() {
        let xml = r#"<a:p xmlns:a="a"><a:pPr lvl="2"><a:buNone/></a:pPr><a:r><a:rPr i="1"/><a:t>one</a:t></a:r><a:br/><a:r><a:rPr i="1" b="1"/><a:t>two</a:t></a:r></a:p>"#;
        let p = XmlDocument::parse(xml.as_bytes()).unwrap().root;
        let para = extract_paragraph(&p);
        assert_eq!(para.text, "one\ntwo");
        assert_eq!(para.level, 2);
        assert!(!para.bulleted);
        assert!(para.italic);
        assert!(!para.bold);
    }

    #[test]
    fn test_extract_shape_placeholder_type_defaults_to_obj() {
        let xml = r#"<p:sp xmlns:p="p" xmlns:a="a"><p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>x</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let sp = XmlDocument::parse(xml.as_bytes()).unwrap().root;
        let shape = extract_shape(&sp);
        assert_eq!(shape.name, "Content 2");
        assert_eq!(shape.placeholder_type.as_deref(), Some("obj"));
        assert_eq!(shape.text(), "x");
        assert!(shape.paragraphs[0].bulleted);
    }
}
