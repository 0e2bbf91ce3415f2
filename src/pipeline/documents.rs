//! Document excerpts for generic question answering

use eyre::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Minimum characters left under the limit before a partial excerpt is added
const MIN_PARTIAL_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub source: String,
    pub content: String,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

fn is_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("txt")
    )
}

fn read_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read document {}", path.display()))?;
    Ok(Document::new(path.display().to_string(), content))
}

/// Load explicit document files plus every `.md`/`.txt` file under `dir`
pub fn load(files: &[PathBuf], dir: Option<&Path>) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for file in files {
        documents.push(read_document(file)?);
    }

    if let Some(dir) = dir {
        if !dir.is_dir() {
            eyre::bail!("Documents directory not found: {}", dir.display());
        }
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_document(e.path()))
            .map(|e| e.into_path())
            .collect();
        paths.sort();
        for path in paths {
            documents.push(read_document(&path)?);
        }
    }

    log::debug!("Loaded {} document(s)", documents.len());
    Ok(documents)
}

/// Concatenate excerpts within `max_chars`
///
/// The document that crosses the limit is cut and marked with `...` when
/// enough room is left; later documents are dropped.
pub fn build_context(documents: &[Document], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;

    for document in documents {
        let entry = format!("[{}]\n{}\n\n", document.source, document.content.trim());
        let len = entry.chars().count();
        if used + len <= max_chars {
            context.push_str(&entry);
            used += len;
            continue;
        }

        let remaining = max_chars - used;
        if remaining >= MIN_PARTIAL_CHARS {
            let partial: String = entry.chars().take(remaining).collect();
            context.push_str(&partial);
            context.push_str("...");
        }
        break;
    }

    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_within_limit() {
        let docs = [Document::new("a.md", "alpha"), Document::new("b.md", "beta")];
        assert_eq!(build_context(&docs, 8000), "[a.md]\nalpha\n\n[b.md]\nbeta");
    }

    #[test]
    fn test_context_truncates_with_ellipsis() {
        let docs = [Document::new("a.md", "x".repeat(50)), Document::new("b.md", "y".repeat(500))];
        let context = build_context(&docs, 200);
        assert!(context.ends_with("..."));
        assert_eq!(context.chars().count(), 203);
    }

    #[test]
    fn test_context_drops_short_remainder() {
        let docs = [Document::new("a.md", "x".repeat(150)), Document::new("b.md", "y".repeat(500))];
        let context = build_context(&docs, 200);
        assert!(!context.contains('y'));
        assert!(!context.ends_with("..."));
    }

    #[test]
    fn test_load_walks_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("one.md"), "first").unwrap();
        fs::write(dir.path().join("nested/two.txt"), "second").unwrap();
        fs::write(dir.path().join("image.png"), "binary").unwrap();

        let docs = load(&[], Some(dir.path())).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.content == "second"));
    }

    #[test]
    fn test_load_missing_dir_fails() {
        assert!(load(&[], Some(Path::new("/nonexistent/persona-qa-docs"))).is_err());
    }
}
