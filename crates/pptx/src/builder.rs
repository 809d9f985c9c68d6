//! End-to-end deck synthesis.
//!
//! [`DeckBuilder`] runs each slide through layout resolution, instantiation,
//! text injection, image placement and pruning, then writes the package to a
//! temporary file beside the output, canonicalizes it there and moves it into
//! place. A failed build leaves nothing at the output path.

use crate::canonicalize::canonicalize_file;
use crate::inject::Injector;
use crate::media::{
    place_image, resolve_asset_path, LoadedImage, PlaceOptions, DEFAULT_GIF_THRESHOLD, DEFAULT_LARGER_IMAGE_MARGIN,
};
use crate::prune::prune_empty_placeholders;
use crate::slide::{add_slide, SlidePart};
use crate::template::Template;
use deck_core::{
    BuildReport, DeckInfo, DiagnosticKind, Diagnostics, Error, LayoutRule, LayoutRules, Result, SlideContent,
    SlideKind,
};
use std::path::{Path, PathBuf};

/// Knobs that are not part of the slide content.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory image references resolve against.
    pub assets_dir: PathBuf,
    /// Byte size above which animated GIFs are flattened.
    pub gif_threshold: u64,
    /// Canvas margin for the larger-image pass, in EMU.
    pub larger_image_margin: i64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            gif_threshold: DEFAULT_GIF_THRESHOLD,
            larger_image_margin: DEFAULT_LARGER_IMAGE_MARGIN,
        }
    }
}

/// Accumulates slides on a template, then writes the deck.
pub struct DeckBuilder<'a> {
    template: Template,
    rules: &'a LayoutRules,
    options: &'a BuildOptions,
    deck: &'a DeckInfo,
    diagnostics: Diagnostics,
    slide_count: usize,
}

impl<'a> DeckBuilder<'a> {
    /// Open the template and prepare an empty deck.
    pub fn open(
        template_path: impl AsRef<Path>,
        deck: &'a DeckInfo,
        rules: &'a LayoutRules,
        options: &'a BuildOptions,
    ) -> Result<Self> {
        let mut diagnostics = Diagnostics::new();
        let template = Template::open(template_path, &mut diagnostics)?;
        Ok(Self {
            template,
            rules,
            options,
            deck,
            diagnostics,
            slide_count: 0,
        })
    }

    /// Append one slide.
    pub fn add(&mut self, content: &SlideContent) -> Result<()> {
        let number = self.slide_count + 1;
        let choice = self.rules.resolve_for(content);
        if choice.rule == LayoutRule::Fallback {
            self.diagnostics.record(
                Some(number),
                DiagnosticKind::UnmappedTemplateKey,
                format!(
                    "no layout rule for key '{}', using '{}'",
                    content.effective_key(),
                    choice.layout_name
                ),
            );
        }

        let layout = self
            .template
            .catalog()
            .lookup(&choice.layout_name, &self.rules.default_layout, number, &mut self.diagnostics)
            .cloned()
            .ok_or_else(|| Error::TemplateError("template defines no layouts".to_string()))?;

        let kind = SlideKind::classify(content);
        log::debug!("Slide {}: key '{}' -> {} ({:?})", number, content.effective_key(), layout.name, kind);

        let mut slide = add_slide(self.template.package_mut(), &layout)?;
        Injector {
            deck: self.deck,
            slide_number: number,
            diagnostics: &mut self.diagnostics,
        }
        .inject(&mut slide, content, kind)?;

        if kind.accepts_image(content.effective_key()) {
            self.place_slide_image(&mut slide, content, kind, number)?;
        }
        prune_empty_placeholders(&mut slide)?;
        slide.save(self.template.package_mut())?;

        self.slide_count = number;
        Ok(())
    }

    /// Place the slide's image, recording a diagnostic when it cannot be used.
    fn place_slide_image(
        &mut self,
        slide: &mut SlidePart,
        content: &SlideContent,
        kind: SlideKind,
        number: usize,
    ) -> Result<()> {
        let Some(reference) = content.image_path.as_deref().filter(|r| !r.trim().is_empty()) else {
            return Ok(());
        };

        let path = resolve_asset_path(&self.options.assets_dir, reference);
        if !path.is_file() {
            self.diagnostics.record(
                Some(number),
                DiagnosticKind::MissingImage,
                format!("image '{}' not found at {}", reference, path.display()),
            );
            return Ok(());
        }

        let image = match LoadedImage::open(&path, self.options.gif_threshold) {
            Ok(image) => image,
            Err(e) => {
                self.diagnostics.record(
                    Some(number),
                    DiagnosticKind::UnreadableImage,
                    format!("image '{}' skipped: {}", reference, e),
                );
                return Ok(());
            }
        };

        let options = PlaceOptions {
            prefer_centered: kind.prefers_centered_image(),
            larger_margin: content.larger_image.then_some(self.options.larger_image_margin),
        };
        let canvas = self.template.canvas();
        place_image(self.template.package_mut(), slide, &image, canvas, options)?;
        Ok(())
    }

    /// Write the deck to `output` and canonicalize it.
    pub fn finish(self, output: impl AsRef<Path>) -> Result<BuildReport> {
        let output = output.as_ref();
        let package = self.template.into_package();

        let working = package.write_temp_beside(output)?;
        canonicalize_file(working.path())?;
        working.persist(output).map_err(|e| Error::IoError(e.error))?;

        log::debug!("Wrote {} slides to {}", self.slide_count, output.display());
        Ok(BuildReport {
            slide_count: self.slide_count,
            diagnostics: self.diagnostics,
        })
    }
}

/// Build a deck from `slides` in order and write it to `output`.
pub fn build_deck(
    template_path: impl AsRef<Path>,
    slides: &[SlideContent],
    deck: &DeckInfo,
    rules: &LayoutRules,
    options: &BuildOptions,
    output: impl AsRef<Path>,
) -> Result<BuildReport> {
    let mut builder = DeckBuilder::open(template_path, deck, rules, options)?;
    for content in slides {
        builder.add(content)?;
    }
    builder.finish(output)
}
