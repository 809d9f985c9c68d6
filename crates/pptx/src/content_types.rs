//! The `[Content_Types].xml` declaration table.
//!
//! Edits are made on parsed `Default` / `Override` entries, never on the
//! serialized text, so unrelated entries are not touched.

use crate::xml::{Element, XmlDocument};
use deck_core::Result;

/// Part name of the declaration table.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type strings used by the builder.
pub mod types {
    pub const TEMPLATE_MAIN: &str = "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml";
    pub const PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const EXTENDED_PROPERTIES: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";
    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
}

/// One declaration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypeEntry {
    /// Applies to every part with this extension.
    Default { extension: String, content_type: String },
    /// Applies to one part, named with a leading slash.
    Override { part_name: String, content_type: String },
}

/// Ordered declaration table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    entries: Vec<ContentTypeEntry>,
}

/// Group rank of an override in canonical order.
fn override_rank(part_name: &str) -> (u8, u8) {
    match part_name {
        "/ppt/presentation.xml" => (2, 0),
        "/docProps/app.xml" => (1, 0),
        "/docProps/core.xml" => (1, 1),
        name if name.starts_with("/docProps/") => (1, 2),
        _ => (0, 0),
    }
}

impl ContentTypes {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(bytes)?;
        let entries = doc
            .root
            .elements()
            .filter_map(|el| {
                let content_type = el.attr("ContentType").unwrap_or_default().to_string();
                if el.is("Default") {
                    Some(ContentTypeEntry::Default {
                        extension: el.attr("Extension").unwrap_or_default().to_string(),
                        content_type,
                    })
                } else if el.is("Override") {
                    Some(ContentTypeEntry::Override {
                        part_name: el.attr("PartName").unwrap_or_default().to_string(),
                        content_type,
                    })
                } else {
                    None
                }
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("Types").with_attr("xmlns", NS_CONTENT_TYPES);
        for entry in &self.entries {
            let el = match entry {
                ContentTypeEntry::Default {
                    extension,
                    content_type,
                } => Element::new("Default")
                    .with_attr("Extension", extension.as_str())
                    .with_attr("ContentType", content_type.as_str()),
                ContentTypeEntry::Override {
                    part_name,
                    content_type,
                } => Element::new("Override")
                    .with_attr("PartName", part_name.as_str())
                    .with_attr("ContentType", content_type.as_str()),
            };
            root.push(el);
        }
        XmlDocument::new(root).to_bytes()
    }

    pub fn entries(&self) -> &[ContentTypeEntry] {
        &self.entries
    }

    /// Override part names in declaration order.
    pub fn override_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ContentTypeEntry::Override { part_name, .. } => Some(part_name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Content type declared for a package path (no leading slash).
    pub fn content_type_of(&self, part: &str) -> Option<&str> {
        let part_name = format!("/{}", part);
        let overridden = self.entries.iter().find_map(|e| match e {
            ContentTypeEntry::Override {
                part_name: name,
                content_type,
            } if name.eq_ignore_ascii_case(&part_name) => Some(content_type.as_str()),
            _ => None,
        });
        overridden.or_else(|| {
            let ext = part.rsplit_once('.')?.1;
            self.entries.iter().find_map(|e| match e {
                ContentTypeEntry::Default {
                    extension,
                    content_type,
                } if extension.eq_ignore_ascii_case(ext) => Some(content_type.as_str()),
                _ => None,
            })
        })
    }

    /// Set the override for a package path, replacing an existing one in place.
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let part_name = format!("/{}", part);
        for entry in &mut self.entries {
            if let ContentTypeEntry::Override {
                part_name: name,
                content_type: ct,
            } = entry
            {
                if *name == part_name {
                    *ct = content_type.to_string();
                    return;
                }
            }
        }
        self.entries.push(ContentTypeEntry::Override {
            part_name,
            content_type: content_type.to_string(),
        });
    }

    pub fn remove_override(&mut self, part: &str) {
        let part_name = format!("/{}", part);
        self.entries
            .retain(|e| !matches!(e, ContentTypeEntry::Override { part_name: name, .. } if *name == part_name));
    }

    /// Declare a default for `extension` unless one exists.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let exists = self.entries.iter().any(|e| {
            matches!(e, ContentTypeEntry::Default { extension: ext, .. } if ext.eq_ignore_ascii_case(extension))
        });
        if exists {
            return;
        }
        let insert_at = self
            .entries
            .iter()
            .rposition(|e| matches!(e, ContentTypeEntry::Default { .. }))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.entries.insert(
            insert_at,
            ContentTypeEntry::Default {
                extension: extension.to_string(),
                content_type: content_type.to_string(),
            },
        );
    }

    /// Replace every declaration of `from` with `to`. Returns the count.
    pub fn replace_content_type(&mut self, from: &str, to: &str) -> usize {
        let mut replaced = 0;
        for entry in &mut self.entries {
            let ct = match entry {
                ContentTypeEntry::Default { content_type, .. } => content_type,
                ContentTypeEntry::Override { content_type, .. } => content_type,
            };
            if ct.as_str() == from {
                *ct = to.to_string();
                replaced += 1;
            }
        }
        replaced
    }

    /// Regroup entries into the order a reference tool writes on resave:
    /// defaults, other overrides, summary-metadata parts, then the main part.
    ///
    /// Relative order within the "other overrides" group is kept.
    pub fn canonicalize_order(&mut self) {
        let (defaults, mut overrides): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| matches!(e, ContentTypeEntry::Default { .. }));
        overrides.sort_by_key(|e| match e {
            ContentTypeEntry::Override { part_name, .. } => override_rank(part_name),
            ContentTypeEntry::Default { .. } => (0, 0),
        });
        self.entries = defaults;
        self.entries.extend(overrides);
    }
}
