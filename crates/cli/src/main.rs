//! CLI tool for building PowerPoint decks from slide content and a template.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::{DeckInfo, LayoutRules, Presentation, SlideContent};
use deck_pptx::{build_deck, BuildOptions, PptxReader};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Build a .pptx deck by filling a template's layouts with slide content.
#[derive(Parser, Debug)]
#[command(name = "deck-build")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template package (.potx or .pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// Deck content as JSON: {"deck": {...}, "slides": [...]}
    #[arg(short, long)]
    slides: PathBuf,

    /// Output .pptx path
    #[arg(short, long)]
    output: PathBuf,

    /// Key to layout rules as JSON (default: built-in rules)
    #[arg(short, long)]
    layouts: Option<PathBuf>,

    /// Directory image references resolve against (default: `assets` beside the slides file)
    #[arg(short, long)]
    assets: Option<PathBuf>,

    /// Byte size above which animated GIFs are embedded as their first frame
    #[arg(long)]
    gif_threshold: Option<u64>,

    /// Print a summary of the written deck
    #[arg(short, long)]
    inspect: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Contents of the `--slides` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeckFile {
    deck: DeckInfo,
    slides: Vec<SlideContent>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let deck_file = read_deck_file(&args.slides)?;
    let rules = match &args.layouts {
        Some(path) => LayoutRules::from_file(path)
            .with_context(|| format!("Failed to load layout rules from {}", path.display()))?,
        None => LayoutRules::default(),
    };

    let mut options = BuildOptions {
        assets_dir: args
            .assets
            .clone()
            .unwrap_or_else(|| default_assets_dir(&args.slides)),
        ..BuildOptions::default()
    };
    if let Some(threshold) = args.gif_threshold {
        options.gif_threshold = threshold;
    }

    if args.verbose {
        eprintln!(
            "Building {} slides from {}",
            deck_file.slides.len(),
            args.template.display()
        );
    }

    let report = build_deck(
        &args.template,
        &deck_file.slides,
        &deck_file.deck,
        &rules,
        &options,
        &args.output,
    )
    .with_context(|| format!("Failed to build {}", args.output.display()))?;

    for diagnostic in report.diagnostics.entries() {
        eprintln!("warning: {}", diagnostic);
    }
    if args.verbose {
        eprintln!("Written {} slides to: {}", report.slide_count, args.output.display());
    }

    if args.inspect {
        let presentation = PptxReader::new()
            .parse_file(&args.output)
            .with_context(|| format!("Failed to read back {}", args.output.display()))?;
        print!("{}", summarize(&presentation));
    }

    Ok(())
}

/// Read the deck content file.
fn read_deck_file(path: &Path) -> Result<DeckFile> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn default_assets_dir(slides: &Path) -> PathBuf {
    match slides.parent() {
        Some(parent) => parent.join("assets"),
        None => PathBuf::from("assets"),
    }
}

/// One line per slide with its layout, then one indented line per shape.
fn summarize(presentation: &Presentation) -> String {
    let mut out = String::new();
    for slide in &presentation.slides {
        out.push_str(&format!(
            "Slide {} [{}]\n",
            slide.number,
            slide.layout_name.as_deref().unwrap_or("?")
        ));
        for shape in &slide.shapes {
            let label = match (&shape.placeholder_type, shape.is_picture) {
                (_, true) => format!(
                    "picture {}",
                    shape.image_target.as_deref().unwrap_or_default()
                ),
                (Some(ph), false) => ph.clone(),
                (None, false) => "shape".to_string(),
            };
            out.push_str(&format!("  {}:", label));
            for paragraph in &shape.paragraphs {
                let indent = "  ".repeat(paragraph.level as usize);
                out.push_str(&format!("\n    {}{}", indent, paragraph.text.replace('\n', " / ")));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{ExtractedParagraph, ExtractedShape, ExtractedSlide};

    #[test]
    fn test_deck_file_camel_case() {
        let json = r#"{
            "deck": {"courseTitle": "Course", "week": "Week 1"},
            "slides": [{"templateKey": "bullets", "bullets": ["a", "--b"], "imagePath": "/assets/x.png"}]
        }"#;
        let deck: DeckFile = serde_json::from_str(json).unwrap();
        assert_eq!(deck.deck.course_title, "Course");
        assert_eq!(deck.deck.date, "");
        assert_eq!(deck.slides[0].template_key, "bullets");
        assert_eq!(deck.slides[0].image_path.as_deref(), Some("/assets/x.png"));
    }

    #[test]
    fn test_default_assets_dir() {
        assert_eq!(
            default_assets_dir(Path::new("content/deck.json")),
            PathBuf::from("content/assets")
        );
    }

    #[test]
    fn test_summarize() {
        let mut presentation = Presentation::new("deck.pptx");
        let mut slide = ExtractedSlide::new(1);
        slide.layout_name = Some("White_Bullets".to_string());
        slide.shapes.push(ExtractedShape {
            name: "Title 1".to_string(),
            placeholder_type: Some("title".to_string()),
            paragraphs: vec![ExtractedParagraph {
                text: "Agenda".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        slide.shapes.push(ExtractedShape {
            placeholder_type: Some("obj".to_string()),
            paragraphs: vec![ExtractedParagraph {
                text: "Second".to_string(),
                level: 1,
                bulleted: true,
                ..Default::default()
            }],
            ..Default::default()
        });
        presentation.add_slide(slide);

        let summary = summarize(&presentation);
        assert_eq!(
            summary,
            "Slide 1 [White_Bullets]\n  title:\n    Agenda\n  obj:\n      Second\n"
        );
    }
}
