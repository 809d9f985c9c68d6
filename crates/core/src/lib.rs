//! Core domain types, layout resolution, inline markup parsing, and fit
//! geometry for template-driven slide deck synthesis.

pub mod error;
pub mod geometry;
pub mod layout;
pub mod markup;
pub mod types;

pub use error::{Error, Result};
pub use geometry::{fit_within, Rect};
pub use layout::{LayoutChoice, LayoutFlags, LayoutRule, LayoutRules, SlideKind};
pub use markup::{bullet_indent, parse_inline, RunStyle, TextRun};
pub use types::{
    BuildReport, DeckInfo, Diagnostic, DiagnosticKind, Diagnostics, ExtractedParagraph, ExtractedShape,
    ExtractedSlide, Presentation, SlideContent,
};
