use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::SourceProcessor;
use crate::types::{ContentType, SourceItem, SourceType};

/// Walks a directory tree and yields one `SourceItem` per regular file.
#[derive(Debug, Clone)]
pub struct FileSourceProcessor {
    root: PathBuf,
}

impl FileSourceProcessor {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    fn read_file_content(&self, file_path: &Path) -> std::io::Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string())
            }
            Err(e) => Err(e),
        }
    }

    fn content_type(file_path: &Path) -> ContentType {
        file_path
            .extension()
            .and_then(|s| s.to_str())
            .map(ContentType::from_extension)
            .unwrap_or_default()
    }

    fn list_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).follow_links(true).into_iter() {
            match entry {
                Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable path"),
            }
        }
        files.sort();
        files
    }
}

impl SourceProcessor for FileSourceProcessor {
    fn process(&self) -> Result<Vec<SourceItem>> {
        if !self.root.exists() {
            return Err(Error::InvalidConfig(format!(
                "source path does not exist: {}",
                self.root.display()
            )));
        }
        let files = self.list_files();
        let mut items = Vec::with_capacity(files.len());
        for file_path in files {
            let content = match self.read_file_content(&file_path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "failed to read file");
                    continue;
                }
            };
            items.push(SourceItem {
                source_type: SourceType::File,
                source_location: file_path.to_string_lossy().to_string(),
                content_type: Self::content_type(&file_path),
                content,
            });
        }
        debug!(root = %self.root.display(), items = items.len(), "scanned source tree");
        Ok(items)
    }
}
