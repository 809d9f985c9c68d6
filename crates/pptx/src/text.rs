//! DrawingML paragraph and run construction.

use crate::xml::Element;
use deck_core::{parse_inline, RunStyle, TextRun};

/// Typeface applied to inline code spans.
pub const CODE_TYPEFACE: &str = "Courier New";

const LANG: &str = "en-US";

/// Bullet treatment of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bullets {
    /// Inherit bullets from the list style at this indent level.
    Level(u8),
    /// `a:buNone`, keeping the inherited margins.
    Hidden,
    /// `a:buNone` with zero left margin and hanging indent.
    HiddenFlush,
}

/// Run properties for a style, optionally forcing italics.
fn run_properties(style: RunStyle, force_italic: bool) -> Element {
    let mut rpr = Element::new("a:rPr").with_attr("lang", LANG);
    if style == RunStyle::Bold {
        rpr.set_attr("b", "1");
    }
    if style == RunStyle::Italic || force_italic {
        rpr.set_attr("i", "1");
    }
    rpr.set_attr("dirty", "0");
    if style == RunStyle::Code {
        rpr.push(Element::new("a:latin").with_attr("typeface", CODE_TYPEFACE));
    }
    rpr
}

/// Runs and line breaks for `runs`; embedded newlines become `a:br`.
pub fn run_elements(runs: &[TextRun], force_italic: bool) -> Vec<Element> {
    let mut out = Vec::new();
    for run in runs {
        for (i, line) in run.text.split('\n').enumerate() {
            if i > 0 {
                out.push(Element::new("a:br").with_child(run_properties(run.style, force_italic)));
            }
            if line.is_empty() {
                continue;
            }
            out.push(
                Element::new("a:r")
                    .with_child(run_properties(run.style, force_italic))
                    .with_child(Element::new("a:t").with_text(line)),
            );
        }
    }
    out
}

fn paragraph_properties(bullets: Bullets) -> Option<Element> {
    match bullets {
        Bullets::Level(0) => None,
        Bullets::Level(level) => Some(Element::new("a:pPr").with_attr("lvl", level.to_string())),
        Bullets::Hidden => Some(Element::new("a:pPr").with_child(Element::new("a:buNone"))),
        Bullets::HiddenFlush => Some(
            Element::new("a:pPr")
                .with_attr("marL", "0")
                .with_attr("indent", "0")
                .with_child(Element::new("a:buNone")),
        ),
    }
}

/// A paragraph from pre-parsed runs.
pub fn paragraph_from_runs(runs: &[TextRun], bullets: Bullets, force_italic: bool) -> Element {
    let mut p = Element::new("a:p");
    if let Some(ppr) = paragraph_properties(bullets) {
        p.push(ppr);
    }
    for el in run_elements(runs, force_italic) {
        p.push(el);
    }
    if runs.iter().all(|r| r.text.is_empty()) {
        p.push(Element::new("a:endParaRPr").with_attr("lang", LANG).with_attr("dirty", "0"));
    }
    p
}

/// A paragraph from marked-up source text.
pub fn paragraph(text: &str, bullets: Bullets) -> Element {
    paragraph_from_runs(&parse_inline(text), bullets, false)
}

/// Replace the paragraphs of a shape's text body.
///
/// `a:bodyPr` and `a:lstStyle` are kept. When the first new paragraph has no
/// `a:pPr`, the first existing paragraph's `a:pPr` carries over so template
/// formatting survives. A missing text body is created.
pub fn set_paragraphs(shape: &mut Element, paragraphs: Vec<Element>) {
    let tx_body = shape.ensure_child("p:txBody");
    if tx_body.child("bodyPr").is_none() {
        tx_body.insert(0, Element::new("a:bodyPr"));
    }

    let inherited_ppr = tx_body
        .child("p")
        .and_then(|p| p.child("pPr"))
        .cloned();
    tx_body.remove_where(|el| el.is("p"));

    let mut paragraphs = paragraphs;
    if paragraphs.is_empty() {
        paragraphs.push(Element::new("a:p"));
    }
    if let (Some(ppr), Some(first)) = (inherited_ppr, paragraphs.first_mut()) {
        if first.child("pPr").is_none() {
            first.insert(0, ppr);
        }
    }
    for p in paragraphs {
        tx_body.push(p);
    }
}
