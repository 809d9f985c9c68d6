//! Synthetic two-master template used across the crate's tests.

use crate::package::Package;
use crate::template::PRESENTATION_PART;
use crate::xml::XmlDocument;
use deck_core::Rect;
use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Frame, ImageFormat, Rgba, RgbaImage, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const MASTER_TITLE_BOUNDS: Rect = Rect {
    x: 838_200,
    y: 365_125,
    cx: 10_515_600,
    cy: 1_325_563,
};

pub const MASTER_BODY_BOUNDS: Rect = Rect {
    x: 838_200,
    y: 1_825_625,
    cx: 10_515_600,
    cy: 4_351_338,
};

/// Body area of `White_Bullets`.
pub const BODY_BOUNDS: Rect = Rect {
    x: 838_200,
    y: 1_690_688,
    cx: 10_515_600,
    cy: 4_486_275,
};

/// Picture area of `White_Bullets_Photo`.
pub const PIC_BOUNDS: Rect = Rect {
    x: 6_172_200,
    y: 987_425,
    cx: 5_181_600,
    cy: 4_873_625,
};

const SPLIT_BODY_BOUNDS: Rect = Rect {
    x: 838_200,
    y: 1_825_625,
    cx: 5_157_787,
    cy: 4_351_338,
};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CT_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_LAYOUT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_NOTES: &str = "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";

/// A placeholder declaration: type, idx, explicit bounds.
type Ph = (Option<&'static str>, Option<&'static str>, Option<Rect>);

const TITLE: Ph = (Some("title"), None, None);
const DATE: Ph = (Some("dt"), Some("10"), None);
const FOOTER: Ph = (Some("ftr"), Some("11"), None);
const SLIDE_NUMBER: Ph = (Some("sldNum"), Some("12"), None);

fn body(bounds: Option<Rect>) -> Ph {
    (None, Some("1"), bounds)
}

/// Layouts of the first and second master, in part-number order.
fn layouts() -> Vec<(&'static str, usize, Vec<Ph>)> {
    vec![
        (
            "Arches_Title",
            1,
            vec![
                (Some("ctrTitle"), None, None),
                (Some("subTitle"), Some("1"), None),
                (Some("body"), Some("13"), None),
            ],
        ),
        (
            "White_Bullets",
            1,
            vec![TITLE, body(Some(BODY_BOUNDS)), DATE, FOOTER, SLIDE_NUMBER],
        ),
        (
            "White_Bullets_Photo",
            1,
            vec![
                TITLE,
                body(Some(SPLIT_BODY_BOUNDS)),
                (Some("pic"), Some("2"), Some(PIC_BOUNDS)),
                DATE,
                FOOTER,
                SLIDE_NUMBER,
            ],
        ),
        ("White_Quote", 1, vec![body(None), SLIDE_NUMBER]),
        ("White_Closing", 1, vec![TITLE, body(None)]),
        ("White_Photo", 1, vec![TITLE, body(None)]),
        ("White_Lines", 1, vec![TITLE, body(None)]),
        ("Title_Only", 1, vec![TITLE, DATE]),
        ("Gold_Bullets", 2, vec![TITLE, body(None)]),
        ("Gold_Quote", 2, vec![body(None)]),
    ]
}

fn xfrm(bounds: Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        bounds.x, bounds.y, bounds.cx, bounds.cy
    )
}

fn placeholder_sp(id: usize, (ph_type, idx, bounds): &Ph) -> String {
    let mut ph = String::from("<p:ph");
    if let Some(t) = ph_type {
        ph.push_str(&format!(r#" type="{}""#, t));
    }
    if let Some(i) = idx {
        ph.push_str(&format!(r#" idx="{}""#, i));
    }
    ph.push_str("/>");
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Placeholder {id}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr>{xfrm}</p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>Click to edit</a:t></a:r></a:p></p:txBody></p:sp>"#,
        id = id,
        ph = ph,
        xfrm = bounds.map(xfrm).unwrap_or_default()
    )
}

fn shape_tree(placeholders: &[Ph]) -> String {
    let shapes: String = placeholders
        .iter()
        .enumerate()
        .map(|(i, ph)| placeholder_sp(i + 2, ph))
        .collect();
    format!(
        r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree>"#,
        shapes
    )
}

fn rels(entries: &[(&str, &str, &str)]) -> Vec<u8> {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
                id, REL_BASE, kind, target
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">{}</Relationships>"#,
        RELS_NS, body
    )
    .into_bytes()
}

fn part(xml: String) -> Vec<u8> {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>{}"#, xml).into_bytes()
}

fn master(layout_numbers: &[usize], theme: usize) -> (Vec<u8>, Vec<u8>) {
    let placeholders = [
        (Some("title"), None, Some(MASTER_TITLE_BOUNDS)),
        (Some("body"), Some("1"), Some(MASTER_BODY_BOUNDS)),
        DATE,
        FOOTER,
        SLIDE_NUMBER,
    ];
    let ids: String = layout_numbers
        .iter()
        .enumerate()
        .map(|(i, _)| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2_147_483_649u64 + i as u64, i + 1))
        .collect();
    let xml = format!(
        r#"<p:sldMaster {ns}><p:cSld>{tree}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst>{ids}</p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle></p:txStyles></p:sldMaster>"#,
        ns = NAMESPACES,
        tree = shape_tree(&placeholders),
        ids = ids
    );

    let mut entries: Vec<(String, &str, String)> = layout_numbers
        .iter()
        .enumerate()
        .map(|(i, n)| {
            (
                format!("rId{}", i + 1),
                "slideLayout",
                format!("../slideLayouts/slideLayout{}.xml", n),
            )
        })
        .collect();
    entries.push((
        format!("rId{}", layout_numbers.len() + 1),
        "theme",
        format!("../theme/theme{}.xml", theme),
    ));
    let borrowed: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    (part(xml), rels(&borrowed))
}

fn layout(name: &str, placeholders: &[Ph]) -> Vec<u8> {
    part(format!(
        r#"<p:sldLayout {} preserve="1"><p:cSld name="{}">{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        NAMESPACES,
        name,
        shape_tree(placeholders)
    ))
}

fn theme(name: &str, major: &str, minor: &str) -> Vec<u8> {
    part(format!(
        r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="{name}"><a:themeElements><a:fontScheme name="{name}"><a:majorFont><a:latin typeface="{major}"/><a:ea typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{minor}"/><a:ea typeface=""/></a:minorFont></a:fontScheme></a:themeElements></a:theme>"#,
        name = name,
        major = major,
        minor = minor
    ))
}

fn content_types(layout_count: usize) -> Vec<u8> {
    let mut overrides = vec![
        (
            "/ppt/presentation.xml".to_string(),
            crate::content_types::types::TEMPLATE_MAIN,
        ),
        ("/docProps/app.xml".to_string(), crate::content_types::types::EXTENDED_PROPERTIES),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), CT_MASTER),
        ("/ppt/slideMasters/slideMaster2.xml".to_string(), CT_MASTER),
        ("/ppt/theme/theme1.xml".to_string(), CT_THEME),
        ("/ppt/theme/theme2.xml".to_string(), CT_THEME),
        ("/docProps/core.xml".to_string(), crate::content_types::types::CORE_PROPERTIES),
    ];
    for n in 1..=layout_count {
        overrides.push((format!("/ppt/slideLayouts/slideLayout{}.xml", n), CT_LAYOUT));
    }
    let body: String = overrides
        .iter()
        .map(|(name, ct)| format!(r#"<Override PartName="{}" ContentType="{}"/>"#, name, ct))
        .collect();
    part(format!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{}</Types>"#,
        body
    ))
}

/// A `.potx` package with masters "Arches" and "Gold" and no slides.
pub fn template_package() -> Package {
    let mut package = Package::default();
    let all = layouts();
    package.set(crate::content_types::CONTENT_TYPES_PART, content_types(all.len()));
    package.set(
        "_rels/.rels",
        rels(&[
            ("rId1", "officeDocument", "ppt/presentation.xml"),
            ("rId2", "extended-properties", "docProps/app.xml"),
        ]),
    );
    package.set(
        "docProps/app.xml",
        part(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><TotalTime>0</TotalTime><Application>Microsoft Office PowerPoint</Application><Slides>0</Slides><AppVersion>16.0000</AppVersion></Properties>"#.to_string()),
    );
    package.set(
        "docProps/core.xml",
        part(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Classroom</dc:title><cp:revision>1</cp:revision></cp:coreProperties>"#.to_string()),
    );
    package.set(
        PRESENTATION_PART,
        part(format!(
            r#"<p:presentation {} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/><p:sldMasterId id="2147483660" r:id="rId2"/></p:sldMasterIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            NAMESPACES
        )),
    );
    package.set(
        "ppt/_rels/presentation.xml.rels",
        rels(&[
            ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            ("rId2", "slideMaster", "slideMasters/slideMaster2.xml"),
            ("rId3", "theme", "theme/theme1.xml"),
        ]),
    );
    package.set("ppt/theme/theme1.xml", theme("Arches", "Georgia", "Arial"));
    package.set("ppt/theme/theme2.xml", theme("Gold", "Georgia", "Verdana"));

    for master_number in [1, 2] {
        let numbers: Vec<usize> = all
            .iter()
            .enumerate()
            .filter(|(_, (_, m, _))| *m == master_number)
            .map(|(i, _)| i + 1)
            .collect();
        let (xml, master_rels) = master(&numbers, master_number);
        package.set(&format!("ppt/slideMasters/slideMaster{}.xml", master_number), xml);
        package.set(
            &format!("ppt/slideMasters/_rels/slideMaster{}.xml.rels", master_number),
            master_rels,
        );
    }

    for (i, (name, master_number, placeholders)) in all.iter().enumerate() {
        let n = i + 1;
        package.set(&format!("ppt/slideLayouts/slideLayout{}.xml", n), layout(name, placeholders));
        package.set(
            &format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", n),
            rels(&[(
                "rId1",
                "slideMaster",
                format!("../slideMasters/slideMaster{}.xml", master_number).as_str(),
            )]),
        );
    }
    package
}

/// Change the `p:cSld@name` of a layout part.
pub fn rename_layout(package: &mut Package, part_name: &str, name: &str) {
    let mut doc = package.xml(part_name).unwrap();
    doc.root.find_mut(&["cSld"]).unwrap().set_attr("name", name);
    package.set_xml(part_name, &doc).unwrap();
}

/// Give the template a slide with speaker notes, as a saved deck would have.
pub fn add_template_slide(package: &mut Package) {
    package.set(
        "ppt/slides/slide1.xml",
        part(format!(
            r#"<p:sld {}><p:cSld>{}</p:cSld></p:sld>"#,
            NAMESPACES,
            shape_tree(&[TITLE])
        )),
    );
    package.set(
        "ppt/slides/_rels/slide1.xml.rels",
        rels(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout2.xml"),
            ("rId2", "notesSlide", "../notesSlides/notesSlide1.xml"),
        ]),
    );
    package.set(
        "ppt/notesSlides/notesSlide1.xml",
        part(format!(r#"<p:notes {}><p:cSld>{}</p:cSld></p:notes>"#, NAMESPACES, shape_tree(&[]))),
    );

    let mut content_types = package.content_types().unwrap();
    content_types.set_override("ppt/slides/slide1.xml", crate::content_types::types::SLIDE);
    content_types.set_override("ppt/notesSlides/notesSlide1.xml", CT_NOTES);
    package.set_content_types(&content_types).unwrap();

    let mut presentation_rels = package.relationships(PRESENTATION_PART).unwrap();
    let rid = presentation_rels.add(crate::relationships::rel_types::SLIDE, "slides/slide1.xml");
    package.set_relationships(PRESENTATION_PART, &presentation_rels).unwrap();

    let mut presentation: XmlDocument = package.xml(PRESENTATION_PART).unwrap();
    let list = crate::xml::Element::new("p:sldIdLst").with_child(
        crate::xml::Element::new("p:sldId")
            .with_attr("id", "256")
            .with_attr("r:id", rid),
    );
    presentation.root.insert(1, list);
    package.set_xml(PRESENTATION_PART, &presentation).unwrap();
}

/// Write the template to `dir/template.potx`.
pub fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("template.potx");
    let file = std::fs::File::create(&path).unwrap();
    template_package().write_to(file).unwrap();
    path
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40])))
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

/// A GIF with `frames` frames of alternating colour.
pub fn animated_gif_bytes(width: u32, height: u32, frames: usize) -> Vec<u8> {
    let mut data = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut data);
        let frames = (0..frames).map(|i| {
            let shade = if i % 2 == 0 { 255 } else { 0 };
            Frame::new(RgbaImage::from_pixel(width, height, Rgba([shade, 0, 255 - shade, 255])))
        });
        encoder.encode_frames(frames).unwrap();
    }
    data
}
