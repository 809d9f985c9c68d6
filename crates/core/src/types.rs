//! Domain types for slide input, build diagnostics, and read-back content.

use serde::{Deserialize, Serialize};

/// Template-agnostic content for one slide.
///
/// Produced by the content store and never mutated during synthesis.
/// Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideContent {
    /// Layout family key, e.g. `bullets-image-top`.
    pub template_key: String,

    /// Render as the deck title slide.
    pub is_title: bool,

    pub headline: String,

    pub paragraph: String,

    /// Bullet strings in display order. Indentation is encoded inline.
    pub bullets: Vec<String>,

    pub quote: String,

    pub quote_citation: String,

    /// Image reference, resolved against the assets directory.
    pub image_path: Option<String>,

    /// Leave the title placeholder untouched.
    pub hide_headline: bool,

    /// Enlarge the placed image after the normal fit.
    pub larger_image: bool,

    /// Prefer the full-bleed photo variant of the layout.
    pub fullscreen: bool,

    /// Fallback key used when `template_key` is empty.
    pub template_base: String,
}

impl SlideContent {
    /// Create content for the given template key.
    pub fn new(template_key: impl Into<String>) -> Self {
        Self {
            template_key: template_key.into(),
            ..Self::default()
        }
    }

    /// The key used for layout resolution and kind classification.
    pub fn effective_key(&self) -> &str {
        if self.template_key.trim().is_empty() {
            self.template_base.trim()
        } else {
            self.template_key.trim()
        }
    }
}

/// Deck-level information shown on the title slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckInfo {
    pub course_title: String,
    pub week: String,
    pub date: String,
}

/// Category of a recoverable problem recorded during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No rule maps the template key; the default layout was used.
    UnmappedTemplateKey,
    /// A resolved layout is absent from the template.
    MissingLayout,
    /// Two masters expose a layout with the same name.
    DuplicateLayout,
    /// A slide has no placeholder for a requested field.
    MissingPlaceholder,
    /// The image file does not exist.
    MissingImage,
    /// The image file could not be decoded.
    UnreadableImage,
    /// A shared package part was missing and a default was substituted.
    MissingPart,
}

/// A non-fatal problem, recorded and logged, that degraded the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based slide number, `None` for package-level diagnostics.
    pub slide: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slide {
            Some(n) => write!(f, "slide {}: {}", n, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Ordered collection of diagnostics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning.
    pub fn record(&mut self, slide: Option<usize>, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            slide,
            kind,
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any diagnostic of `kind` was recorded.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// Append all diagnostics from `other`, keeping order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Number of slides written, equal to the number of inputs.
    pub slide_count: usize,
    pub diagnostics: Diagnostics,
}

/// A presentation read back from a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Slides in presentation order.
    pub slides: Vec<ExtractedSlide>,
}

impl Presentation {
    /// Create an empty presentation with the given filename.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: ExtractedSlide) {
        self.slides.push(slide);
    }
}

/// A single slide read back from a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSlide {
    /// 1-based slide number.
    pub number: usize,

    /// Name of the layout the slide was built from, if resolvable.
    pub layout_name: Option<String>,

    /// Top-level shapes in z-order (back to front).
    pub shapes: Vec<ExtractedShape>,
}

impl ExtractedSlide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            layout_name: None,
            shapes: Vec::new(),
        }
    }

    /// The first shape whose placeholder type is `ph_type`.
    pub fn placeholder(&self, ph_type: &str) -> Option<&ExtractedShape> {
        self.shapes
            .iter()
            .find(|s| s.placeholder_type.as_deref() == Some(ph_type))
    }

    /// All picture shapes on the slide.
    pub fn pictures(&self) -> Vec<&ExtractedShape> {
        self.shapes.iter().filter(|s| s.is_picture).collect()
    }
}

/// A shape read back from a slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedShape {
    pub name: String,

    /// Raw `p:ph@type`, `Some("obj")` when a placeholder omits it.
    pub placeholder_type: Option<String>,

    /// True for `p:pic` elements.
    pub is_picture: bool,

    /// Relationship target of the embedded image, for pictures.
    pub image_target: Option<String>,

    /// Explicit bounds in EMU as `(x, y, cx, cy)`, when present on the slide.
    pub bounds: Option<(i64, i64, i64, i64)>,

    pub paragraphs: Vec<ExtractedParagraph>,
}

impl ExtractedShape {
    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A paragraph read back from a text body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedParagraph {
    pub text: String,

    /// `a:pPr@lvl`, 0 when absent.
    pub level: u8,

    /// False when the paragraph carries `a:buNone`.
    pub bulleted: bool,

    /// True when every non-empty run is italic.
    pub italic: bool,

    /// True when every non-empty run is bold.
    pub bold: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_key_falls_back_to_base() {
        let mut content = SlideContent::default();
        content.template_base = "bullets".to_string();
        assert_eq!(content.effective_key(), "bullets");

        content.template_key = "bullets-image-top".to_string();
        assert_eq!(content.effective_key(), "bullets-image-top");
    }

    #[test]
    fn test_slide_content_deserializes_camel_case() {
        let json = r#"{
            "templateKey": "quote",
            "quote": "Speed matters",
            "quoteCitation": "A. Engineer",
            "largerImage": true
        }"#;
        let content: SlideContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.template_key, "quote");
        assert_eq!(content.quote_citation, "A. Engineer");
        assert!(content.larger_image);
        assert!(content.bullets.is_empty());
        assert_eq!(content.image_path, None);
    }

    #[test]
    fn test_diagnostics_record() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(Some(2), DiagnosticKind::MissingImage, "cat.png not found");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.has(DiagnosticKind::MissingImage));
        assert!(!diagnostics.has(DiagnosticKind::MissingLayout));
        assert_eq!(diagnostics.entries()[0].to_string(), "slide 2: cat.png not found");
    }
}
