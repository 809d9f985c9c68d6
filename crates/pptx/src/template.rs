//! Template loading and the layout catalog.
//!
//! A [`Template`] owns the package being assembled. Opening it patches a
//! `.potx` main content type, drops any slides the template already carries,
//! and indexes every layout of every master by name.

use crate::content_types::{types, ContentTypes};
use crate::package::Package;
use crate::relationships::{rel_types, rels_path_for, resolve_target, Relationships};
use crate::xml::{Element, XmlDocument};
use deck_core::{DiagnosticKind, Diagnostics, Error, Rect, Result};
use std::collections::HashMap;
use std::path::Path;

/// Main part of a presentation package.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Slide size used when `p:sldSz` is absent (16:9, 13.333in × 7.5in).
pub const DEFAULT_SLIDE_SIZE: (i64, i64) = (12_192_000, 6_858_000);

/// A placeholder declared on a layout or master.
#[derive(Debug, Clone, PartialEq)]
pub struct InheritedPlaceholder {
    /// Shape name, e.g. `Title 1`.
    pub name: String,
    /// Raw `p:ph@type`; `None` means the schema default (`obj`).
    pub ph_type: Option<String>,
    pub idx: Option<String>,
    pub orient: Option<String>,
    pub sz: Option<String>,
    /// Explicit `a:xfrm` on the declaring part.
    pub bounds: Option<Rect>,
}

impl InheritedPlaceholder {
    /// Read a placeholder declaration from a `p:sp`, if it is one.
    pub fn from_shape(sp: &Element) -> Option<Self> {
        let ph = sp.find(&["nvSpPr", "nvPr", "ph"])?;
        let name = sp
            .find(&["nvSpPr", "cNvPr"])
            .and_then(|c| c.attr("name"))
            .unwrap_or_default()
            .to_string();
        Some(Self {
            name,
            ph_type: ph.attr("type").map(str::to_string),
            idx: ph.attr("idx").map(str::to_string),
            orient: ph.attr("orient").map(str::to_string),
            sz: ph.attr("sz").map(str::to_string),
            bounds: shape_bounds(sp),
        })
    }

    /// The `type` attribute with its schema default applied.
    pub fn effective_type(&self) -> &str {
        self.ph_type.as_deref().unwrap_or("obj")
    }
}

/// Explicit `spPr/a:xfrm` geometry of a shape.
pub fn shape_bounds(shape: &Element) -> Option<Rect> {
    let xfrm = shape.find(&["spPr", "xfrm"])?;
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    Some(Rect::new(
        off.attr_i64("x")?,
        off.attr_i64("y")?,
        ext.attr_i64("cx")?,
        ext.attr_i64("cy")?,
    ))
}

/// Placeholders declared in a layout or master part.
fn placeholders_of(doc: &XmlDocument) -> Vec<InheritedPlaceholder> {
    doc.root
        .find(&["cSld", "spTree"])
        .map(|tree| {
            tree.children_named("sp")
                .filter_map(InheritedPlaceholder::from_shape)
                .collect()
        })
        .unwrap_or_default()
}

/// A named layout and everything a slide built from it inherits.
#[derive(Debug, Clone)]
pub struct LayoutHandle {
    /// `p:cSld@name`.
    pub name: String,
    /// Package path of the layout part.
    pub part_name: String,
    /// Package path of the owning master.
    pub master_part: String,
    /// Layout placeholders in document order.
    pub placeholders: Vec<InheritedPlaceholder>,
    /// Master placeholders in document order.
    pub master_placeholders: Vec<InheritedPlaceholder>,
}

/// Map the type of a layout placeholder to the master placeholder it
/// inherits from.
fn master_type(ph_type: &str) -> &str {
    match ph_type {
        "title" | "ctrTitle" => "title",
        "dt" | "ftr" | "sldNum" | "hdr" => ph_type,
        _ => "body",
    }
}

impl LayoutHandle {
    /// Layout placeholder matching a slide placeholder: by `idx` when given,
    /// otherwise by type.
    pub fn layout_placeholder(&self, ph_type: Option<&str>, idx: Option<&str>) -> Option<&InheritedPlaceholder> {
        let by_idx = idx.and_then(|idx| self.placeholders.iter().find(|p| p.idx.as_deref() == Some(idx)));
        by_idx.or_else(|| {
            let wanted = ph_type.unwrap_or("obj");
            self.placeholders.iter().find(|p| p.effective_type() == wanted)
        })
    }

    /// Master placeholder a slide placeholder of `ph_type` inherits from.
    pub fn master_placeholder(&self, ph_type: Option<&str>) -> Option<&InheritedPlaceholder> {
        let wanted = master_type(ph_type.unwrap_or("obj"));
        self.master_placeholders
            .iter()
            .find(|p| master_type(p.effective_type()) == wanted)
    }

    /// Effective bounds of a placeholder through the layout → master chain.
    pub fn inherited_bounds(&self, ph_type: Option<&str>, idx: Option<&str>) -> Option<Rect> {
        let from_layout = self.layout_placeholder(ph_type, idx);
        if let Some(bounds) = from_layout.and_then(|p| p.bounds) {
            return Some(bounds);
        }
        let effective = from_layout.map(|p| p.effective_type()).or(ph_type);
        self.master_placeholder(effective).and_then(|p| p.bounds)
    }
}

/// Every layout of every master, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct LayoutCatalog {
    layouts: HashMap<String, LayoutHandle>,
    /// Names in first-seen order.
    order: Vec<String>,
}

impl LayoutCatalog {
    /// Index the layouts of `package`.
    ///
    /// Masters are visited in `p:sldMasterIdLst` order and layouts in each
    /// master's `p:sldLayoutIdLst` order. When two layouts share a name the
    /// later one is kept and a diagnostic is recorded.
    pub fn build(package: &Package, diagnostics: &mut Diagnostics) -> Result<Self> {
        let presentation = package.xml(PRESENTATION_PART)?;
        let presentation_rels = package.relationships(PRESENTATION_PART)?;

        let mut catalog = Self::default();
        for master_part in master_parts(&presentation, &presentation_rels) {
            let master = package.xml(&master_part)?;
            let master_rels = package.relationships(&master_part)?;
            let master_placeholders = placeholders_of(&master);

            for layout_part in layout_parts(&master_part, &master, &master_rels) {
                let layout = match package.xml(&layout_part) {
                    Ok(doc) => doc,
                    Err(e) => {
                        diagnostics.record(
                            None,
                            DiagnosticKind::MissingPart,
                            format!("layout part '{}' unreadable: {}", layout_part, e),
                        );
                        continue;
                    }
                };
                let name = layout
                    .root
                    .find(&["cSld"])
                    .and_then(|c| c.attr("name"))
                    .unwrap_or_default()
                    .to_string();
                let handle = LayoutHandle {
                    name,
                    part_name: layout_part,
                    master_part: master_part.clone(),
                    placeholders: placeholders_of(&layout),
                    master_placeholders: master_placeholders.clone(),
                };
                catalog.insert(handle, diagnostics);
            }
        }

        log::debug!("Indexed {} layouts", catalog.len());
        Ok(catalog)
    }

    fn insert(&mut self, handle: LayoutHandle, diagnostics: &mut Diagnostics) {
        if let Some(previous) = self.layouts.get(&handle.name) {
            diagnostics.record(
                None,
                DiagnosticKind::DuplicateLayout,
                format!(
                    "layout '{}' in {} shadows the one in {}",
                    handle.name, handle.part_name, previous.part_name
                ),
            );
        } else {
            self.order.push(handle.name.clone());
        }
        self.layouts.insert(handle.name.clone(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&LayoutHandle> {
        self.layouts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    /// Layout names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The first layout of the first master.
    pub fn first(&self) -> Option<&LayoutHandle> {
        self.order.first().and_then(|n| self.layouts.get(n))
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Look up `name`, falling back to `default_name` and then to the first
    /// layout. Each fallback records a diagnostic against `slide`.
    pub fn lookup(
        &self,
        name: &str,
        default_name: &str,
        slide: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<&LayoutHandle> {
        if let Some(handle) = self.get(name) {
            return Some(handle);
        }
        let fallback = self.get(default_name).or_else(|| self.first());
        diagnostics.record(
            Some(slide),
            DiagnosticKind::MissingLayout,
            format!(
                "layout '{}' not found in template, using '{}'",
                name,
                fallback.map(|h| h.name.as_str()).unwrap_or("<none>")
            ),
        );
        fallback
    }
}

/// Master parts in `p:sldMasterIdLst` order.
fn master_parts(presentation: &XmlDocument, rels: &Relationships) -> Vec<String> {
    let listed: Vec<String> = presentation
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
    if !listed.is_empty() {
        return listed;
    }
    rels.of_type(rel_types::SLIDE_MASTER)
        .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
        .collect()
}

/// Layout parts of a master in `p:sldLayoutIdLst` order.
fn layout_parts(master_part: &str, master: &XmlDocument, rels: &Relationships) -> Vec<String> {
    let listed: Vec<String> = master
        .root
        .find(&["sldLayoutIdLst"])
        .map(|list| {
            list.children_named("sldLayoutId")
                .filter_map(|id| id.attr("r:id"))
                .filter_map(|rid| rels.get(rid))
                .map(|rel| resolve_target(master_part, &rel.target))
                .collect()
        })
        .unwrap_or_default();
    if !listed.is_empty() {
        return listed;
    }
    rels.of_type(rel_types::SLIDE_LAYOUT)
        .map(|rel| resolve_target(master_part, &rel.target))
        .collect()
}

/// An opened template, ready to receive slides.
#[derive(Debug)]
pub struct Template {
    package: Package,
    catalog: LayoutCatalog,
    slide_size: (i64, i64),
}

impl Template {
    /// Open a `.potx` or `.pptx` template.
    pub fn open(path: impl AsRef<Path>, diagnostics: &mut Diagnostics) -> Result<Self> {
        let path = path.as_ref();
        let package = Package::open(path)
            .map_err(|e| Error::TemplateError(format!("Cannot open template '{}': {}", path.display(), e)))?;
        Self::from_package(package, diagnostics)
    }

    /// Prepare an in-memory package as a template.
    pub fn from_package(mut package: Package, diagnostics: &mut Diagnostics) -> Result<Self> {
        if !package.contains(PRESENTATION_PART) {
            return Err(Error::TemplateError(format!(
                "template has no '{}' part",
                PRESENTATION_PART
            )));
        }

        let mut content_types = package.content_types()?;
        if content_types.replace_content_type(types::TEMPLATE_MAIN, types::PRESENTATION_MAIN) > 0 {
            log::debug!("Rewrote template main content type to presentation");
            package.set_content_types(&content_types)?;
        }

        let dropped = drop_existing_slides(&mut package)?;
        if dropped > 0 {
            log::warn!("Removed {} slide(s) already present in the template", dropped);
        }

        let catalog = LayoutCatalog::build(&package, diagnostics)?;
        if catalog.is_empty() {
            return Err(Error::TemplateError("template defines no layouts".to_string()));
        }

        let presentation = package.xml(PRESENTATION_PART)?;
        let slide_size = presentation
            .root
            .child("sldSz")
            .and_then(|sz| Some((sz.attr_i64("cx")?, sz.attr_i64("cy")?)))
            .unwrap_or(DEFAULT_SLIDE_SIZE);

        Ok(Self {
            package,
            catalog,
            slide_size,
        })
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.catalog
    }

    /// Slide width and height in EMU.
    pub fn slide_size(&self) -> (i64, i64) {
        self.slide_size
    }

    /// The full canvas as a rectangle.
    pub fn canvas(&self) -> Rect {
        Rect::new(0, 0, self.slide_size.0, self.slide_size.1)
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    /// Split into the package and catalog for concurrent borrowing.
    pub fn parts_mut(&mut self) -> (&mut Package, &LayoutCatalog) {
        (&mut self.package, &self.catalog)
    }

    pub fn into_package(self) -> Package {
        self.package
    }
}

/// Remove every slide the package lists, with its relationships, notes and
/// declarations. Returns the number removed.
fn drop_existing_slides(package: &mut Package) -> Result<usize> {
    let mut presentation = package.xml(PRESENTATION_PART)?;
    let mut rels = package.relationships(PRESENTATION_PART)?;
    let removed = rels.remove_where(|r| r.rel_type == rel_types::SLIDE);
    if removed.is_empty() {
        return Ok(0);
    }

    if let Some(list) = presentation.root.child_mut("sldIdLst") {
        list.remove_where(|el| el.is("sldId"));
    }
    presentation
        .root
        .remove_where(|el| el.is("sldIdLst") && el.elements().next().is_none());

    let mut content_types = package.content_types()?;
    for rel in &removed {
        let slide_part = resolve_target(PRESENTATION_PART, &rel.target);
        let slide_rels = package.relationships(&slide_part)?;
        for notes in slide_rels.of_type(rel_types::NOTES_SLIDE) {
            let notes_part = resolve_target(&slide_part, &notes.target);
            remove_part(package, &mut content_types, &notes_part);
        }
        remove_part(package, &mut content_types, &slide_part);
    }

    package.set_xml(PRESENTATION_PART, &presentation)?;
    package.set_relationships(PRESENTATION_PART, &rels)?;
    package.set_content_types(&content_types)?;
    Ok(removed.len())
}

fn remove_part(package: &mut Package, content_types: &mut ContentTypes, part: &str) {
    package.remove(part);
    package.remove(&rels_path_for(part));
    content_types.remove_override(part);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_catalog_spans_all_masters() {
        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(testutil::template_package(), &mut diagnostics).unwrap();
        let catalog = template.catalog();

        assert!(catalog.contains("White_Bullets"));
        assert!(catalog.contains("Gold_Bullets"));
        assert!(catalog.contains("Arches_Title"));
        assert_eq!(catalog.first().map(|h| h.name.as_str()), Some("Arches_Title"));
        assert_eq!(
            catalog.get("Gold_Quote").map(|h| h.master_part.as_str()),
            Some("ppt/slideMasters/slideMaster2.xml")
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_potx_main_type_is_patched() {
        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(testutil::template_package(), &mut diagnostics).unwrap();
        let content_types = template.package().content_types().unwrap();
        assert_eq!(
            content_types.content_type_of(PRESENTATION_PART),
            Some(types::PRESENTATION_MAIN)
        );
        assert_eq!(template.slide_size(), (12_192_000, 6_858_000));
    }

    #[test]
    fn test_duplicate_layout_last_wins() {
        let mut package = testutil::template_package();
        testutil::rename_layout(&mut package, "ppt/slideLayouts/slideLayout9.xml", "White_Bullets");

        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(package, &mut diagnostics).unwrap();
        let handle = template.catalog().get("White_Bullets").unwrap();
        assert_eq!(handle.part_name, "ppt/slideLayouts/slideLayout9.xml");
        assert!(diagnostics.has(DiagnosticKind::DuplicateLayout));
    }

    #[test]
    fn test_lookup_falls_back_to_default() {
        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(testutil::template_package(), &mut diagnostics).unwrap();
        let handle = template
            .catalog()
            .lookup("No_Such_Layout", "White_Bullets", 3, &mut diagnostics)
            .unwrap();
        assert_eq!(handle.name, "White_Bullets");
        assert_eq!(diagnostics.entries()[0].slide, Some(3));
        assert!(diagnostics.has(DiagnosticKind::MissingLayout));
    }

    #[test]
    fn test_existing_slides_are_dropped() {
        let mut package = testutil::template_package();
        testutil::add_template_slide(&mut package);

        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(package, &mut diagnostics).unwrap();
        let package = template.package();
        assert!(!package.contains("ppt/slides/slide1.xml"));
        assert!(!package.contains("ppt/slides/_rels/slide1.xml.rels"));
        let rels = package.relationships(PRESENTATION_PART).unwrap();
        assert_eq!(rels.of_type(rel_types::SLIDE).count(), 0);
        let content_types = package.content_types().unwrap();
        assert!(!content_types
            .override_names()
            .contains(&"/ppt/slides/slide1.xml"));
    }

    #[test]
    fn test_inherited_bounds_walk_layout_then_master() {
        let mut diagnostics = Diagnostics::new();
        let template = Template::from_package(testutil::template_package(), &mut diagnostics).unwrap();
        let layout = template.catalog().get("White_Bullets").unwrap();

        // The layout's title has no xfrm; geometry comes from the master.
        assert_eq!(layout.inherited_bounds(Some("title"), None), Some(testutil::MASTER_TITLE_BOUNDS));
        assert_eq!(layout.inherited_bounds(None, Some("1")), Some(testutil::BODY_BOUNDS));
    }

    #[test]
    fn test_missing_presentation_part_is_fatal() {
        let mut package = testutil::template_package();
        package.remove(PRESENTATION_PART);
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            Template::from_package(package, &mut diagnostics),
            Err(Error::TemplateError(_))
        ));
    }
}
