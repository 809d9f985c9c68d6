//! Package metadata canonicalization.
//!
//! Brings a written package to the form the reference authoring tool
//! produces on resave: content-type overrides regrouped, an `a:pPr` on every
//! slide paragraph, and `docProps/app.xml` counters and part titles
//! recomputed. Running it twice changes nothing the second time.

use crate::content_types::{types, CONTENT_TYPES_PART};
use crate::package::Package;
use crate::reader::{paragraph_text, part_number, slide_parts};
use crate::relationships::{rel_types, resolve_target};
use crate::template::PRESENTATION_PART;
use crate::xml::{Element, Node, XmlDocument};
use deck_core::markup::word_count;
use deck_core::Result;
use std::path::Path;

pub const APP_PART: &str = "docProps/app.xml";
pub const CORE_PART: &str = "docProps/core.xml";

/// Title listed for a slide without title text.
pub const UNTITLED_SLIDE: &str = "PowerPoint Presentation";

/// Most fonts listed under "Fonts Used".
pub const MAX_LISTED_FONTS: usize = 10;

const NS_EXTENDED: &str = "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const NS_VT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

/// Order of `Properties` children as PowerPoint writes them.
const APP_ELEMENT_ORDER: [&str; 18] = [
    "Template",
    "TotalTime",
    "Words",
    "Application",
    "PresentationFormat",
    "Paragraphs",
    "Slides",
    "Notes",
    "HiddenSlides",
    "MMClips",
    "ScaleCrop",
    "HeadingPairs",
    "TitlesOfParts",
    "Company",
    "LinksUpToDate",
    "SharedDoc",
    "HyperlinksChanged",
    "AppVersion",
];

/// What a canonicalization pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalizeReport {
    /// `a:pPr` elements inserted across slide parts.
    pub inserted_paragraph_properties: usize,
    /// Whether `docProps/app.xml` differs from its previous content.
    pub app_changed: bool,
    /// Whether `docProps/app.xml` had to be created.
    pub app_created: bool,
    pub statistics: DocumentStatistics,
}

/// Aggregate counts written to `docProps/app.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStatistics {
    pub slides: usize,
    pub notes: usize,
    pub paragraphs: usize,
    pub words: usize,
    pub fonts: Vec<String>,
    pub themes: Vec<String>,
    pub slide_titles: Vec<String>,
}

/// Canonicalize the package file at `path` in place.
///
/// The result is written to a temporary file beside `path` and moved over
/// it only when everything succeeded.
pub fn canonicalize_file(path: impl AsRef<Path>) -> Result<CanonicalizeReport> {
    let path = path.as_ref();
    let mut package = Package::open(path)?;
    let report = canonicalize_package(&mut package)?;
    package.save_atomic(path)?;
    Ok(report)
}

/// Canonicalize an in-memory package.
pub fn canonicalize_package(package: &mut Package) -> Result<CanonicalizeReport> {
    let slides = slide_parts(package)?;
    let mut report = CanonicalizeReport::default();

    for slide in &slides {
        report.inserted_paragraph_properties += insert_missing_paragraph_properties(package, slide)?;
    }

    let statistics = collect_statistics(package, &slides)?;
    let (app_changed, app_created) = write_app_properties(package, &statistics)?;
    if app_changed {
        bump_core_revision(package)?;
    }

    let mut content_types = package.content_types()?;
    content_types.canonicalize_order();
    package.set_content_types(&content_types)?;

    log::debug!(
        "Canonicalized: {} slides, {} paragraphs, {} words, {} pPr inserted",
        statistics.slides,
        statistics.paragraphs,
        statistics.words,
        report.inserted_paragraph_properties
    );
    report.app_changed = app_changed;
    report.app_created = app_created;
    report.statistics = statistics;
    Ok(report)
}

/// Give every `a:p` without one an empty leading `a:pPr`.
fn insert_missing_paragraph_properties(package: &mut Package, slide: &str) -> Result<usize> {
    let mut doc = package.xml(slide)?;
    let mut inserted = 0;
    doc.root.visit_mut("p", &mut |p: &mut Element| {
        if p.child("pPr").is_none() {
            p.insert(0, Element::new("a:pPr"));
            inserted += 1;
        }
    });
    if inserted > 0 {
        package.set_xml(slide, &doc)?;
    }
    Ok(inserted)
}

fn notes_parts(package: &Package, slides: &[String]) -> Result<Vec<String>> {
    let mut notes = Vec::new();
    for slide in slides {
        let rels = package.relationships(slide)?;
        for rel in rels.of_type(rel_types::NOTES_SLIDE) {
            let part = resolve_target(slide, &rel.target);
            if package.contains(&part) {
                notes.push(part);
            }
        }
    }
    Ok(notes)
}

/// Count paragraphs with visible text and their words.
fn count_text(doc: &XmlDocument) -> (usize, usize) {
    let Some(c_sld) = doc.root.child("cSld") else {
        return (0, 0);
    };
    c_sld
        .descendants("p")
        .iter()
        .map(|p| paragraph_text(p))
        .filter(|text| !text.trim().is_empty())
        .fold((0, 0), |(paragraphs, words), text| (paragraphs + 1, words + word_count(&text)))
}

fn slide_title(doc: &XmlDocument) -> Option<String> {
    let tree = doc.root.find(&["cSld", "spTree"])?;
    let title = tree.children_named("sp").find(|sp| {
        sp.find(&["nvSpPr", "nvPr", "ph"])
            .and_then(|ph| ph.attr("type"))
            .map(|t| t == "title" || t == "ctrTitle")
            .unwrap_or(false)
    })?;
    let text = title
        .child("txBody")?
        .children_named("p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Parts of a kind (`ppt/slideLayouts/slideLayout`) sorted by number.
fn numbered_parts(package: &Package, prefix: &str) -> Vec<String> {
    let mut parts: Vec<String> = package
        .part_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    parts.sort_by_key(|p| (part_number(p).unwrap_or(usize::MAX), p.clone()));
    parts
}

fn master_parts(package: &Package) -> Result<Vec<String>> {
    let presentation = package.xml(PRESENTATION_PART)?;
    let rels = package.relationships(PRESENTATION_PART)?;
    let masters: Vec<String> = presentation
        .root
        .find(&["sldMasterIdLst"])
        .map(|list| {
            list.children_named("sldMasterId")
                .filter_map(|id| id.attr("r:id"))
                .filter_map(|rid| rels.get(rid))
                .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
                .collect()
        })
        .unwrap_or_default();
    Ok(masters)
}

fn push_fonts(doc: &XmlDocument, fonts: &mut Vec<String>) {
    for latin in doc.root.descendants("latin") {
        let Some(face) = latin.attr("typeface") else {
            continue;
        };
        if face.is_empty() || face.starts_with('+') || fonts.iter().any(|f| f == face) {
            continue;
        }
        fonts.push(face.to_string());
    }
}

fn collect_statistics(package: &Package, slides: &[String]) -> Result<DocumentStatistics> {
    let mut stats = DocumentStatistics {
        slides: slides.len(),
        ..Default::default()
    };

    let masters = master_parts(package)?;
    let mut theme_parts = Vec::new();
    for master in &masters {
        let rels = package.relationships(master)?;
        if let Some(rel) = rels.first_of_type(rel_types::THEME) {
            let theme = resolve_target(master, &rel.target);
            if !theme_parts.contains(&theme) {
                theme_parts.push(theme);
            }
        }
    }

    let mut font_sources: Vec<String> = theme_parts.clone();
    font_sources.extend(masters.iter().cloned());
    font_sources.extend(numbered_parts(package, "ppt/slideLayouts/slideLayout"));
    font_sources.extend(slides.iter().cloned());
    for part in &font_sources {
        if let Ok(doc) = package.xml(part) {
            push_fonts(&doc, &mut stats.fonts);
        }
    }
    stats.fonts.truncate(MAX_LISTED_FONTS);

    for theme in &theme_parts {
        if let Ok(doc) = package.xml(theme) {
            if let Some(name) = doc.root.attr("name") {
                stats.themes.push(name.to_string());
            }
        }
    }

    for slide in slides {
        let doc = package.xml(slide)?;
        let (paragraphs, words) = count_text(&doc);
        stats.paragraphs += paragraphs;
        stats.words += words;
        stats
            .slide_titles
            .push(slide_title(&doc).unwrap_or_else(|| UNTITLED_SLIDE.to_string()));
    }

    let notes = notes_parts(package, slides)?;
    stats.notes = notes.len();
    for part in &notes {
        let doc = package.xml(part)?;
        let (paragraphs, words) = count_text(&doc);
        stats.paragraphs += paragraphs;
        stats.words += words;
    }

    Ok(stats)
}

fn text_element(name: &str, value: impl Into<String>) -> Element {
    Element::new(name).with_text(value)
}

fn heading_pairs(stats: &DocumentStatistics) -> Element {
    let groups = [
        ("Fonts Used", stats.fonts.len()),
        ("Theme", stats.themes.len()),
        ("Slide Titles", stats.slide_titles.len()),
    ];
    let mut vector = Element::new("vt:vector").with_attr("baseType", "variant");
    let mut size = 0;
    for (label, count) in groups.iter().filter(|(_, count)| *count > 0) {
        vector.push(Element::new("vt:variant").with_child(text_element("vt:lpstr", *label)));
        vector.push(Element::new("vt:variant").with_child(text_element("vt:i4", count.to_string())));
        size += 2;
    }
    vector.attrs.insert(0, ("size".to_string(), size.to_string()));
    Element::new("HeadingPairs").with_child(vector)
}

fn titles_of_parts(stats: &DocumentStatistics) -> Element {
    let titles: Vec<&String> = stats
        .fonts
        .iter()
        .chain(stats.themes.iter())
        .chain(stats.slide_titles.iter())
        .collect();
    let mut vector = Element::new("vt:vector")
        .with_attr("size", titles.len().to_string())
        .with_attr("baseType", "lpstr");
    for title in titles {
        vector.push(text_element("vt:lpstr", title.as_str()));
    }
    Element::new("TitlesOfParts").with_child(vector)
}

fn app_rank(local: &str) -> usize {
    APP_ELEMENT_ORDER
        .iter()
        .position(|n| *n == local)
        .unwrap_or(APP_ELEMENT_ORDER.len())
}

/// Replace the child with `element`'s name, or insert it in canonical order.
fn put_app_element(root: &mut Element, element: Element) {
    let local = element.local_name().to_string();
    if let Some(index) = root.position(&local) {
        root.children[index] = Node::Element(element);
        return;
    }
    let rank = app_rank(&local);
    let index = root
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(el) if app_rank(el.local_name()) > rank))
        .unwrap_or(root.children.len());
    root.insert(index, element);
}

fn app_skeleton() -> XmlDocument {
    let root = Element::new("Properties")
        .with_attr("xmlns", NS_EXTENDED)
        .with_attr("xmlns:vt", NS_VT)
        .with_child(text_element("TotalTime", "0"))
        .with_child(text_element("Application", "Microsoft Office PowerPoint"))
        .with_child(text_element("HiddenSlides", "0"))
        .with_child(text_element("MMClips", "0"))
        .with_child(text_element("ScaleCrop", "false"))
        .with_child(text_element("LinksUpToDate", "false"))
        .with_child(text_element("SharedDoc", "false"))
        .with_child(text_element("HyperlinksChanged", "false"))
        .with_child(text_element("AppVersion", "16.0000"));
    XmlDocument::new(root)
}

/// Write recomputed statistics. Returns `(changed, created)`.
fn write_app_properties(package: &mut Package, stats: &DocumentStatistics) -> Result<(bool, bool)> {
    let (original, created) = match package.get(APP_PART) {
        Some(data) => (Some(XmlDocument::parse(data)?), false),
        None => (None, true),
    };
    let mut doc = original.clone().unwrap_or_else(app_skeleton);

    put_app_element(&mut doc.root, text_element("Words", stats.words.to_string()));
    put_app_element(&mut doc.root, text_element("Paragraphs", stats.paragraphs.to_string()));
    put_app_element(&mut doc.root, text_element("Slides", stats.slides.to_string()));
    put_app_element(&mut doc.root, text_element("Notes", stats.notes.to_string()));
    put_app_element(&mut doc.root, heading_pairs(stats));
    put_app_element(&mut doc.root, titles_of_parts(stats));

    let changed = original.as_ref() != Some(&doc);
    if changed {
        package.set_xml(APP_PART, &doc)?;
    }
    if created {
        log::warn!("Package had no {}; created one", APP_PART);
        let mut content_types = package.content_types()?;
        content_types.set_override(APP_PART, types::EXTENDED_PROPERTIES);
        package.set_content_types(&content_types)?;

        let mut root_rels = package.relationships("")?;
        if root_rels.first_of_type(rel_types::EXTENDED_PROPERTIES).is_none() {
            root_rels.add(rel_types::EXTENDED_PROPERTIES, APP_PART);
            package.set_relationships("", &root_rels)?;
        }
    }
    Ok((changed, created))
}

/// Increment `cp:revision` in the core properties, adding it when absent.
fn bump_core_revision(package: &mut Package) -> Result<()> {
    if !package.contains(CORE_PART) {
        return Ok(());
    }
    let mut doc = package.xml(CORE_PART)?;
    match doc.root.child_mut("revision") {
        Some(revision) => {
            let next = revision.text().trim().parse::<u64>().unwrap_or(0) + 1;
            revision.children = vec![Node::Text(next.to_string())];
        }
        None => doc.root.push(text_element("cp:revision", "1")),
    }
    package.set_xml(CORE_PART, &doc)
}

/// Whether `package` declares its parts in canonical order.
pub fn is_canonical_order(package: &Package) -> Result<bool> {
    let content_types = package.content_types()?;
    let mut sorted = content_types.clone();
    sorted.canonicalize_order();
    Ok(sorted == content_types && package.contains(CONTENT_TYPES_PART))
}
