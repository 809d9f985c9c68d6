//! In-memory OPC package backed by a ZIP container.

use crate::content_types::{ContentTypes, CONTENT_TYPES_PART};
use crate::relationships::{rels_path_for, Relationships};
use crate::xml::XmlDocument;
use deck_core::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// All parts of a package, in container order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Read every part of the package at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path.display(), e)))
    }

    /// Read every part from a ZIP stream.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.push((name, data));
        }
        Ok(Self { parts })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    /// Store a part, replacing it in place or appending it.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let index = self.parts.iter().position(|(n, _)| n == name)?;
        Some(self.parts.remove(index).1)
    }

    /// Part names in container order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Parse an XML part. Missing parts are a corrupted-package error.
    pub fn xml(&self, name: &str) -> Result<XmlDocument> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::CorruptedFile(format!("missing part '{}'", name)))?;
        XmlDocument::parse(data).map_err(|e| Error::XmlError(format!("{}: {}", name, e)))
    }

    pub fn set_xml(&mut self, name: &str, doc: &XmlDocument) -> Result<()> {
        let bytes = doc.to_bytes()?;
        self.set(name, bytes);
        Ok(())
    }

    /// Relationships owned by `part_name`; empty when the part has none.
    pub fn relationships(&self, part_name: &str) -> Result<Relationships> {
        match self.get(&rels_path_for(part_name)) {
            Some(data) => Relationships::parse(data),
            None => Ok(Relationships::new()),
        }
    }

    pub fn set_relationships(&mut self, part_name: &str, rels: &Relationships) -> Result<()> {
        let bytes = rels.to_bytes()?;
        self.set(&rels_path_for(part_name), bytes);
        Ok(())
    }

    pub fn content_types(&self) -> Result<ContentTypes> {
        let data = self
            .get(CONTENT_TYPES_PART)
            .ok_or_else(|| Error::CorruptedFile(format!("missing part '{}'", CONTENT_TYPES_PART)))?;
        ContentTypes::parse(data)
    }

    pub fn set_content_types(&mut self, content_types: &ContentTypes) -> Result<()> {
        let bytes = content_types.to_bytes()?;
        self.set(CONTENT_TYPES_PART, bytes);
        Ok(())
    }

    /// Smallest `{prefix}{n}{suffix}` with `n >= 1` that is not in use.
    pub fn next_part_name(&self, prefix: &str, suffix: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}{}{}", prefix, n, suffix);
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Write the container, declaration table first.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .iter()
            .filter(|(n, _)| n == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|(n, _)| n != CONTENT_TYPES_PART));
        for (name, data) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(data)?;
        }
        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(())
    }

    /// Write to a temporary file beside `path`, then atomically move it over
    /// `path`. On any error `path` is left as it was.
    pub fn save_atomic(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let temp = self.write_temp_beside(path)?;
        temp.persist(path)
            .map_err(|e| Error::IoError(e.error))?;
        Ok(())
    }

    /// Write the package to a new temporary file in `path`'s directory.
    ///
    /// The file is deleted when the handle drops unless it is persisted.
    pub fn write_temp_beside(&self, path: &Path) -> Result<NamedTempFile> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        self.write_to(temp.as_file_mut())?;
        temp.as_file_mut().sync_all()?;
        Ok(temp)
    }
}
