//! Template key to layout resolution and slide kind classification.
//!
//! The key → layout table is data: [`LayoutRules`] deserializes from the
//! JSON file stored next to the template. Built-in defaults describe the
//! reference classroom template.

use crate::types::SlideContent;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Layout used for title slides in the reference template.
pub const DEFAULT_TITLE_LAYOUT: &str = "Arches_Title";

/// Layout used when no rule matches a key.
pub const DEFAULT_LAYOUT: &str = "White_Bullets";

/// Key → layout rules with override tables for slide flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutRules {
    /// Layout for slides flagged `is_title`.
    pub title_layout: String,

    /// Layout for keys that match no rule.
    pub default_layout: String,

    /// Direct key → layout table.
    pub layouts: HashMap<String, String>,

    /// Full-bleed photo variants, consulted when `fullscreen` is set.
    pub fullscreen: HashMap<String, String>,

    /// Photo variants without a headline, consulted when `hide_headline` is set.
    pub hide_headline: HashMap<String, String>,

    /// Variants with a larger picture area, consulted when `larger_image` is set.
    pub larger_image: HashMap<String, String>,
}

impl Default for LayoutRules {
    fn default() -> Self {
        let layouts = table(&[
            ("bullets", "White_Bullets"),
            ("template-bullets", "White_Bullets"),
            ("gold-bullets", "Gold_Bullets"),
            ("bullets-image", "White_Bullets_Photo"),
            ("template-bullets-image", "White_Bullets_Photo"),
            ("bullets-image-split", "White_Bullets_Photo"),
            ("bullets-image-top", "White_Top_Bullets_Photo"),
            ("gold-bullets-image-split", "Gold_Bullets_Photo"),
            ("gold-bullets-image-top", "Gold_Top_Bullets_Photo"),
            ("full-photo-headline", "White_Full_Photo_Headline"),
            ("photo-centered", "White_Photo"),
            ("quote", "White_Quote"),
            ("gold-quote", "Gold_Quote"),
            ("closing", "White_Closing"),
            ("lines", "White_Lines"),
            ("template-lines", "White_Lines"),
            ("gold-lines", "Gold_Lines"),
        ]);
        let fullscreen = table(&[
            ("bullets-image", "White_Full_Photo_Headline"),
            ("bullets-image-split", "White_Full_Photo_Headline"),
            ("bullets-image-top", "White_Full_Photo_Headline"),
            ("photo-centered", "White_Full_Photo"),
        ]);
        let hide_headline = table(&[
            ("full-photo-headline", "White_Full_Photo"),
            ("bullets-image-top", "White_Top_Photo"),
        ]);
        let larger_image = table(&[
            ("bullets-image", "White_Bullets_Photo_Large"),
            ("bullets-image-top", "White_Top_Bullets_Photo_Large"),
        ]);

        Self {
            title_layout: DEFAULT_TITLE_LAYOUT.to_string(),
            default_layout: DEFAULT_LAYOUT.to_string(),
            layouts,
            fullscreen,
            hide_headline,
            larger_image,
        }
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Flags that select an override variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutFlags {
    pub is_title: bool,
    pub hide_headline: bool,
    pub larger_image: bool,
    pub fullscreen: bool,
}

impl From<&SlideContent> for LayoutFlags {
    fn from(content: &SlideContent) -> Self {
        Self {
            is_title: content.is_title,
            hide_headline: content.hide_headline,
            larger_image: content.larger_image,
            fullscreen: content.fullscreen,
        }
    }
}

/// Which rule produced a layout name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRule {
    Title,
    Fullscreen,
    HideHeadline,
    LargerImage,
    Direct,
    /// No rule matched; the default layout was substituted.
    Fallback,
}

/// A resolved layout name and the rule that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutChoice {
    pub layout_name: String,
    pub rule: LayoutRule,
}

impl LayoutRules {
    /// Load rules from a JSON file. Missing tables take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse rules from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve `key` under `flags` to a layout name.
    ///
    /// Overrides are checked in the order fullscreen, hide-headline,
    /// larger-image; the first table containing the key wins. Without an
    /// override the direct table is used, then the default layout.
    pub fn resolve(&self, key: &str, flags: LayoutFlags) -> LayoutChoice {
        if flags.is_title {
            return LayoutChoice {
                layout_name: self.title_layout.clone(),
                rule: LayoutRule::Title,
            };
        }

        let overrides = [
            (flags.fullscreen, &self.fullscreen, LayoutRule::Fullscreen),
            (flags.hide_headline, &self.hide_headline, LayoutRule::HideHeadline),
            (flags.larger_image, &self.larger_image, LayoutRule::LargerImage),
        ];
        for (enabled, rules, rule) in overrides {
            if !enabled {
                continue;
            }
            if let Some(name) = rules.get(key) {
                return LayoutChoice {
                    layout_name: name.clone(),
                    rule,
                };
            }
        }

        match self.layouts.get(key) {
            Some(name) => LayoutChoice {
                layout_name: name.clone(),
                rule: LayoutRule::Direct,
            },
            None => LayoutChoice {
                layout_name: self.default_layout.clone(),
                rule: LayoutRule::Fallback,
            },
        }
    }

    /// Resolve the layout for a slide's effective key and flags.
    pub fn resolve_for(&self, content: &SlideContent) -> LayoutChoice {
        self.resolve(content.effective_key(), LayoutFlags::from(content))
    }
}

/// How a slide's content is distributed over its placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Title,
    Quote,
    Closing,
    PhotoCentered,
    TextOnly,
    DefaultBullets,
}

impl SlideKind {
    /// Classify a slide.
    ///
    /// Precedence: title flag, then key fragments `quote`, `closing`,
    /// `photo-centered`, `lines`; anything else is a bullet slide.
    pub fn classify(content: &SlideContent) -> Self {
        if content.is_title {
            return SlideKind::Title;
        }
        let key = content.effective_key();
        if key.contains("quote") {
            SlideKind::Quote
        } else if key.contains("closing") {
            SlideKind::Closing
        } else if key.contains("photo-centered") {
            SlideKind::PhotoCentered
        } else if key.contains("lines") {
            SlideKind::TextOnly
        } else {
            SlideKind::DefaultBullets
        }
    }

    /// Whether an image reference on this kind is placed. Bullet slides take
    /// one only when their key names an image layout.
    pub fn accepts_image(self, key: &str) -> bool {
        match self {
            SlideKind::Closing | SlideKind::PhotoCentered => true,
            SlideKind::DefaultBullets => key.contains("image"),
            SlideKind::Title | SlideKind::Quote | SlideKind::TextOnly => false,
        }
    }

    /// Whether image placement should favour a centered canvas position over
    /// an empty text placeholder.
    pub fn prefers_centered_image(self) -> bool {
        self == SlideKind::PhotoCentered
    }
}
