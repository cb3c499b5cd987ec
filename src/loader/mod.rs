//! Document loading from the local documents folder.
//!
//! Each supported file extension maps to exactly one [`DocumentFormat`], and each
//! format knows how to turn a file into plain text.

mod pdf;

use crate::error::{LexwiseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parsing strategy for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// PDF; all pages are concatenated into one document.
    Pdf,
    /// UTF-8 text.
    Text,
}

impl DocumentFormat {
    /// Look up the format registered for a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" | "md" => Some(DocumentFormat::Text),
            _ => None,
        }
    }

    /// Look up the format for a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Extract the text content of a file in this format.
    pub fn extract(self, path: &Path) -> Result<String> {
        match self {
            DocumentFormat::Pdf => pdf::extract_text(path),
            DocumentFormat::Text => std::fs::read_to_string(path).map_err(|e| {
                LexwiseError::Loader(format!("Failed to read {}: {}", path.display(), e))
            }),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Text => write!(f, "text"),
        }
    }
}

/// A loaded source file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Where the content was read from.
    pub source_path: PathBuf,
    /// Full extracted text.
    pub page_content: String,
    pub format: DocumentFormat,
}

impl SourceDocument {
    /// Create a document from already-extracted content.
    pub fn new(source_path: impl Into<PathBuf>, page_content: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            source_path: source_path.into(),
            page_content: page_content.into(),
            format,
        }
    }

    /// File name without directories or extension, used to derive record ids.
    pub fn base_name(&self) -> String {
        base_name(&self.source_path.to_string_lossy())
    }
}

/// Strip directories and the final extension from a path string.
///
/// Both `/` and `\` are treated as separators, so Windows paths behave the same
/// on every platform. A leading dot (hidden file) is not treated as an extension.
pub fn base_name(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);

    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name[..dot].to_string(),
        _ => file_name.to_string(),
    }
}

/// List the file names directly inside a folder, sorted.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Load every supported document under a folder, recursing into subfolders.
///
/// Files with unregistered extensions are skipped with a warning. Documents are
/// returned in path order so ingestion runs are reproducible.
pub fn load_directory(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Err(LexwiseError::Loader(format!(
            "Documents folder not found: {}",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                paths.push(path);
            }
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match DocumentFormat::from_path(&path) {
            Some(format) => {
                debug!("Loading {} as {}", path.display(), format);
                let page_content = format.extract(&path)?;
                documents.push(SourceDocument::new(path, page_content, format));
            }
            None => warn!("Skipping unsupported file: {}", path.display()),
        }
    }

    info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_registry() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
        assert_eq!(DocumentFormat::from_path(Path::new("notes")), None);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("./documents/contract.pdf"), "contract");
        assert_eq!(base_name(r"C:\docs\lease.v2.txt"), "lease.v2");
        assert_eq!(base_name("plain"), "plain");
        assert_eq!(base_name("dir.d/README"), "README");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_load_directory_skips_unknown_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.md"), "third").unwrap();

        let docs = load_directory(dir.path()).unwrap();
        let names: Vec<String> = docs.iter().map(|d| d.base_name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(docs[0].page_content, "first");
        assert!(docs.iter().all(|d| d.format == DocumentFormat::Text));
    }

    #[test]
    fn test_load_directory_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(load_directory(&missing), Err(LexwiseError::Loader(_))));
    }

    #[test]
    fn test_list_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("z.pdf"), "").unwrap();
        std::fs::write(dir.path().join("m.txt"), "").unwrap();

        assert_eq!(list_files(dir.path()).unwrap(), vec!["m.txt", "z.pdf"]);
    }
}
