//! Note sources and reference extraction.
//!
//! A note source yields note identities (index, title) and, for the same
//! notes in the same order, the raw outgoing references found in each note.
//! This module handles:
//! - The `NoteSource` trait consumed by the graph builder
//! - A filesystem source reading a flat directory of Markdown notes
//! - An in-memory source
//! - Wikilink rewriting and relative link extraction from Markdown

use crate::error::NotesError;
use crate::models::Note;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

// ============================================================================
// Note Source
// ============================================================================

pub trait NoteSource: Send + Sync {
    /// Note identities in stable order. The i-th entry carries index i.
    fn titles(&self) -> Result<Vec<(usize, String)>, NotesError>;

    /// The same notes as `titles`, in the same order, with their references.
    fn notes(&self) -> Result<Vec<(usize, Note)>, NotesError>;

    /// Digest of the source contents. Changes whenever a rebuild is needed.
    fn fingerprint(&self) -> Result<String, NotesError>;
}

impl<T: NoteSource + ?Sized> NoteSource for std::sync::Arc<T> {
    fn titles(&self) -> Result<Vec<(usize, String)>, NotesError> {
        (**self).titles()
    }

    fn notes(&self) -> Result<Vec<(usize, Note)>, NotesError> {
        (**self).notes()
    }

    fn fingerprint(&self) -> Result<String, NotesError> {
        (**self).fingerprint()
    }
}

// ============================================================================
// Filesystem Source
// ============================================================================

/// Reads every regular file directly inside `dir` as a Markdown note, sorted
/// by file name. Dotfiles are skipped.
#[derive(Debug, Clone)]
pub struct FsNoteSource {
    dir: PathBuf,
}

impl FsNoteSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn note_paths(&self) -> Result<Vec<PathBuf>, NotesError> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|source| NotesError::ReadDir {
                path: self.dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            paths.push(entry.into_path());
        }

        Ok(paths)
    }
}

impl NoteSource for FsNoteSource {
    fn titles(&self) -> Result<Vec<(usize, String)>, NotesError> {
        Ok(self
            .note_paths()?
            .iter()
            .map(|path| title_from_path(path))
            .enumerate()
            .collect())
    }

    fn notes(&self) -> Result<Vec<(usize, Note)>, NotesError> {
        use rayon::prelude::*;

        let paths = self.note_paths()?;
        paths
            .par_iter()
            .enumerate()
            .map(|(index, path)| load_note(path).map(|note| (index, note)))
            .collect()
    }

    fn fingerprint(&self) -> Result<String, NotesError> {
        let mut hasher = Sha256::new();
        for path in self.note_paths()? {
            let metadata = fs::metadata(&path).map_err(|source| NotesError::Io {
                path: path.clone(),
                source,
            })?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .unwrap_or_default();

            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(metadata.len().to_le_bytes());
            hasher.update(modified.as_nanos().to_le_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// A note's title is its file name without the extension.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn load_note(path: &Path) -> Result<Note, NotesError> {
    let content = fs::read_to_string(path).map_err(|source| NotesError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Note {
        title: title_from_path(path),
        references: extract_references(&content),
    })
}

// ============================================================================
// In-Memory Source
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryNoteSource {
    notes: Vec<Note>,
}

impl MemoryNoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, title: &str, references: &[&str]) -> Self {
        self.push(Note::new(
            title,
            references.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    pub fn push(&mut self, note: Note) {
        self.notes.push(note);
    }
}

impl NoteSource for MemoryNoteSource {
    fn titles(&self) -> Result<Vec<(usize, String)>, NotesError> {
        Ok(self
            .notes
            .iter()
            .map(|note| note.title.clone())
            .enumerate()
            .collect())
    }

    fn notes(&self) -> Result<Vec<(usize, Note)>, NotesError> {
        Ok(self.notes.iter().cloned().enumerate().collect())
    }

    fn fingerprint(&self) -> Result<String, NotesError> {
        let mut hasher = Sha256::new();
        for note in &self.notes {
            hasher.update(note.title.as_bytes());
            for reference in &note.references {
                hasher.update([0]);
                hasher.update(reference.as_bytes());
            }
            hasher.update([1]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

// ============================================================================
// Reference Extraction
// ============================================================================

fn wikilink_regex() -> &'static Regex {
    static WIKILINK: OnceLock<Regex> = OnceLock::new();
    WIKILINK.get_or_init(|| {
        Regex::new(r"\[\[([^\[\]|]+)(?:\|([^\[\]]+))?\]\]").expect("wikilink regex is valid")
    })
}

/// Rewrite `[[Target]]` and `[[Target|Label]]` into relative Markdown links.
pub fn rewrite_wikilinks(content: &str) -> Cow<'_, str> {
    wikilink_regex().replace_all(content, |caps: &regex::Captures| {
        let target = caps[1].trim();
        let label = caps.get(2).map(|m| m.as_str().trim()).unwrap_or(target);
        format!("[{}](<./{}>)", label, target)
    })
}

/// All same-collection link targets in a Markdown note, in document order.
/// Absolute and external links are ignored.
pub fn extract_references(content: &str) -> Vec<String> {
    let markdown = rewrite_wikilinks(content);
    Parser::new(&markdown)
        .filter_map(|event| match event {
            Event::Start(Tag::Link { dest_url, .. }) => relative_target(&dest_url),
            _ => None,
        })
        .collect()
}

/// Turn a link destination like `./Some%20Note.md#part` into `Some Note`.
/// Returns `None` for anything that is not a `./` relative link.
pub fn relative_target(dest: &str) -> Option<String> {
    let rest = dest.strip_prefix("./")?;
    let rest = rest.split('#').next().unwrap_or(rest);
    let decoded = urlencoding::decode(rest)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| rest.to_string());
    let title = decoded.strip_suffix(".md").unwrap_or(&decoded);

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_wikilinks() {
        assert_eq!(
            rewrite_wikilinks("see [[Graph Theory]] and [[b|the b note]]"),
            "see [Graph Theory](<./Graph Theory>) and [the b note](<./b>)"
        );
        assert!(matches!(rewrite_wikilinks("no links"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_extract_references_wikilinks_and_relative_links() {
        let content = "# Title\n\n[[Alpha]] then [beta](./Beta.md) and [[Gamma Ray|gamma]].\n";
        assert_eq!(
            extract_references(content),
            vec!["Alpha", "Beta", "Gamma Ray"]
        );
    }

    #[test]
    fn test_extract_references_ignores_external_links() {
        let content = "[site](https://example.com) [abs](/Alpha) [up](../Alpha) [rel](./Alpha)";
        assert_eq!(extract_references(content), vec!["Alpha"]);
    }

    #[test]
    fn test_extract_references_ignores_code() {
        let content = "`[[Inline]]`\n\n```\n[[Fenced]]\n```\n\n[[Real]]\n";
        assert_eq!(extract_references(content), vec!["Real"]);
    }

    #[test]
    fn test_extract_references_keeps_duplicates() {
        assert_eq!(extract_references("[[A]] [[A]]"), vec!["A", "A"]);
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("./Some%20Note"), Some("Some Note".to_string()));
        assert_eq!(relative_target("./Note.md#section"), Some("Note".to_string()));
        assert_eq!(relative_target("./"), None);
        assert_eq!(relative_target("http://x/y"), None);
        assert_eq!(relative_target("Note"), None);
    }

    #[test]
    fn test_fs_source_reads_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "links to [[a]]").unwrap();
        fs::write(dir.path().join("a.md"), "links to [[b]] and [[zzz]]").unwrap();
        fs::write(dir.path().join(".hidden"), "[[a]]").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.md"), "[[a]]").unwrap();

        let source = FsNoteSource::new(dir.path());
        assert_eq!(
            source.titles().unwrap(),
            vec![(0, "a".to_string()), (1, "b".to_string())]
        );

        let notes = source.notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].0, 0);
        assert_eq!(notes[0].1.title, "a");
        assert_eq!(notes[0].1.references, vec!["b", "zzz"]);
        assert_eq!(notes[1].1.references, vec!["a"]);
    }

    #[test]
    fn test_fs_source_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsNoteSource::new(dir.path().join("missing"));
        assert!(matches!(source.titles(), Err(NotesError::ReadDir { .. })));
    }

    #[test]
    fn test_fs_fingerprint_changes_with_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "first").unwrap();
        let source = FsNoteSource::new(dir.path());
        let before = source.fingerprint().unwrap();
        assert_eq!(before, source.fingerprint().unwrap());

        fs::write(dir.path().join("b.md"), "second").unwrap();
        assert_ne!(before, source.fingerprint().unwrap());
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryNoteSource::new()
            .with_note("A", &["B"])
            .with_note("B", &[]);
        assert_eq!(
            source.titles().unwrap(),
            vec![(0, "A".to_string()), (1, "B".to_string())]
        );
        let notes = source.notes().unwrap();
        assert_eq!(notes[0].1.references, vec!["B"]);

        let other = MemoryNoteSource::new().with_note("A", &["B"]);
        assert_ne!(source.fingerprint().unwrap(), other.fingerprint().unwrap());
    }
}
