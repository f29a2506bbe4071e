//! ZIP container of a DOCX file.
//!
//! Entries keep their original order. Parts selected at load time are parsed
//! into [`XmlTree`]s; every other entry is carried as raw bytes and written
//! back untouched.

use std::io::{Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::XmlTree;
use crate::error::DocumentError;

#[derive(Debug, Clone)]
pub enum EntryContent {
    Directory,
    Raw(Vec<u8>),
    Xml(XmlTree),
}

#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub name: String,
    pub content: EntryContent,
}

#[derive(Debug, Clone, Default)]
pub struct Package {
    entries: Vec<PackageEntry>,
}

impl Package {
    /// Read every entry, parsing the ones `parse_part` selects
    pub fn read<R, F>(reader: R, parse_part: F) -> Result<Self, DocumentError>
    where
        R: Read + Seek,
        F: Fn(&str) -> bool,
    {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();

            let content = if file.is_dir() {
                EntryContent::Directory
            } else {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                if parse_part(&name) {
                    let tree = XmlTree::parse(&bytes).map_err(|e| DocumentError::InvalidPart {
                        part: name.clone(),
                        message: e.to_string(),
                    })?;
                    EntryContent::Xml(tree)
                } else {
                    EntryContent::Raw(bytes)
                }
            };

            entries.push(PackageEntry { name, content });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn raw_part(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find_map(|entry| match entry {
            PackageEntry {
                name: entry_name,
                content: EntryContent::Raw(bytes),
            } if entry_name == name => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn xml_part_mut(&mut self, name: &str) -> Option<&mut XmlTree> {
        self.xml_parts_mut()
            .find(|(entry_name, _)| *entry_name == name)
            .map(|(_, tree)| tree)
    }

    /// Parsed parts with their entry names, in package order
    pub fn xml_parts_mut(&mut self) -> impl Iterator<Item = (&str, &mut XmlTree)> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            PackageEntry {
                name,
                content: EntryContent::Xml(tree),
            } => Some((name.as_str(), tree)),
            _ => None,
        })
    }

    /// Serialize the package, returning the writer once the archive is finished
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, DocumentError> {
        let mut zip = ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            match &entry.content {
                EntryContent::Directory => zip.add_directory(entry.name.as_str(), options)?,
                EntryContent::Raw(bytes) => {
                    zip.start_file(entry.name.as_str(), options)?;
                    zip.write_all(bytes)?;
                }
                EntryContent::Xml(tree) => {
                    zip.start_file(entry.name.as_str(), options)?;
                    zip.write_all(&tree.to_bytes()?)?;
                }
            }
        }

        Ok(zip.finish()?)
    }
}
