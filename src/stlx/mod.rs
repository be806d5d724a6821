//! The `.stlx` project file adapter.
//!
//! Reads a versioned XML document into a [`Story`] and writes one back,
//! keeping the previous file as `<path>.bak` while the new one is written.

mod document;
mod xml;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

pub use document::{build_document, parse_story};
pub use xml::XmlElement;

use crate::error::StlxError;
use crate::story::Story;

pub const EXTENSION: &str = "stlx";

/// Document version this build reads and writes.
pub const MAJOR_VERSION: u32 = 1;
pub const MINOR_VERSION: u32 = 0;

/// Prepended to every written file in a second pass.
pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE stlx SYSTEM "stlx_1_0.dtd">
<?xml-stylesheet href="stlx.css" type="text/css"?>
"#;

/// A project file on disk, plus the modification time seen at the last
/// successful read or write.
#[derive(Debug, Clone)]
pub struct StlxFile {
    path: PathBuf,
    timestamp: Option<SystemTime>,
}

impl StlxFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.bak`
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    /// Local `YYYY-MM-DD hh:mm:ss` of the last read or write.
    pub fn file_date(&self) -> Option<String> {
        self.timestamp.map(|ts| {
            DateTime::<Local>::from(ts)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
    }

    /// Whether the file was touched by someone else since our last read or write.
    ///
    /// A file we never read or wrote is reported unchanged. A file that has
    /// since vanished is reported changed.
    pub fn has_changed_on_disk(&self) -> bool {
        let Some(timestamp) = self.timestamp else {
            return false;
        };
        match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified != timestamp,
            Err(_) => true,
        }
    }

    /// Parse the file into a fresh story and remember its modification time.
    pub fn read(&mut self) -> Result<Story, StlxError> {
        let text = fs::read_to_string(&self.path).map_err(|e| StlxError::io(&self.path, e))?;
        let story = parse_story(&text).map_err(|e| match e {
            StlxError::Format(message) => {
                StlxError::Format(format!("{}: \"{}\"", message, self.path.display()))
            }
            other => other,
        })?;
        self.timestamp = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        tracing::info!(
            "Read {} with {} arcs, {} characters, {} books",
            self.path.display(),
            story.arcs().len(),
            story.characters().len(),
            story.books().len()
        );
        Ok(story)
    }

    /// Write the story, keeping the previous file intact until the new one is complete.
    pub fn write(&mut self, story: &Story) -> Result<(), StlxError> {
        self.write_with(story, |path, bytes| fs::write(path, bytes))
    }

    /// 1. Serialize the whole document in memory, refusing characters
    ///    XML cannot represent.
    /// 2. Rename an existing file to `.bak`; failing here leaves it untouched.
    /// 3. Write the body, then prepend the header in a second pass.
    /// 4. On any failure after step 2, move the `.bak` back.
    fn write_with(
        &mut self,
        story: &Story,
        mut emit: impl FnMut(&Path, &[u8]) -> io::Result<()>,
    ) -> Result<(), StlxError> {
        let document = build_document(story);
        if let Some((element, c)) = document.find_invalid_char() {
            return Err(StlxError::format(format!(
                "Cannot write {:?} in <{}>: not allowed in XML: \"{}\"",
                c,
                element,
                self.path.display()
            )));
        }
        let body = document.to_indented_string();
        let backup = self.backup_path();

        let backed_up = if self.path.is_file() {
            fs::rename(&self.path, &backup).map_err(|e| StlxError::io(&self.path, e))?;
            true
        } else {
            false
        };

        let written = emit(&self.path, body.as_bytes())
            .and_then(|()| prepend_header(&self.path, &mut emit));
        if let Err(e) = written {
            if backed_up {
                if let Err(restore) = fs::rename(&backup, &self.path) {
                    tracing::error!(
                        "Could not restore {} from {}: {}",
                        self.path.display(),
                        backup.display(),
                        restore
                    );
                }
            } else if self.path.exists() {
                let _ = fs::remove_file(&self.path);
            }
            return Err(StlxError::io(&self.path, e));
        }

        self.timestamp = Some(
            fs::metadata(&self.path)
                .and_then(|m| m.modified())
                .map_err(|e| StlxError::io(&self.path, e))?,
        );
        tracing::info!("Wrote {}", self.path.display());
        Ok(())
    }
}

fn prepend_header(
    path: &Path,
    emit: &mut impl FnMut(&Path, &[u8]) -> io::Result<()>,
) -> io::Result<()> {
    let body = fs::read(path)?;
    let mut bytes = Vec::with_capacity(XML_HEADER.len() + body.len());
    bytes.extend_from_slice(XML_HEADER.as_bytes());
    bytes.extend_from_slice(&body);
    emit(path, &bytes)
}
