//! PPTX (Office Open XML) backend for template-driven deck synthesis.
//!
//! A deck is built by opening a template package, instantiating one slide
//! per content record from a named layout, filling its placeholders, and
//! writing the result through the metadata canonicalizer.

pub mod builder;
pub mod canonicalize;
pub mod content_types;
pub mod inject;
pub mod media;
pub mod package;
pub mod placeholder;
pub mod prune;
pub mod reader;
pub mod relationships;
pub mod slide;
pub mod template;
pub mod text;
pub mod xml;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{build_deck, BuildOptions, DeckBuilder};
pub use canonicalize::{canonicalize_file, canonicalize_package, CanonicalizeReport};
pub use package::Package;
pub use reader::PptxReader;
pub use template::{LayoutCatalog, LayoutHandle, Template};
