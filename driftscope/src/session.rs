// THEORY:
// A `ComparisonSession` is the scope of one side-by-side comparison run: the
// ordered image sequence scanned from a source directory, the ordered modifier
// selection applied to every image in that sequence, and a cursor for the
// auto-advancing "next" operation. The sequence is fixed at build time;
// changing the selection means building a new session.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// Raster extensions the scanner accepts, lowercase.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no modifiers selected")]
    EmptySelection,
    #[error("no images found in {0}")]
    NoImages(String),
    #[error("failed to read source directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One comparison run: an immutable image sequence, a modifier selection, and
/// the auto-advance cursor.
#[derive(Debug, Clone)]
pub struct ComparisonSession {
    /// Sorted, deduplicated-by-name image filenames.
    images: Vec<String>,
    /// Ordered operator names, applied to every image in the sequence.
    selection: Vec<String>,
    /// The index the next `advance` call hands out.
    cursor: usize,
}

impl ComparisonSession {
    /// Scans `source_dir` for raster images and builds a session over them.
    /// The selection must be non-empty; the directory must hold at least one
    /// image.
    pub fn scan(source_dir: &Path, selection: Vec<String>) -> Result<Self, SessionError> {
        if selection.is_empty() {
            return Err(SessionError::EmptySelection);
        }

        // A BTreeSet gives the sorted, name-deduplicated sequence in one pass.
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(source_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_image = Path::new(&name)
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                names.insert(name);
            }
        }
        if names.is_empty() {
            return Err(SessionError::NoImages(source_dir.display().to_string()));
        }

        Ok(Self {
            images: names.into_iter().collect(),
            selection,
            cursor: 0,
        })
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The filename at `index`, if in range.
    pub fn filename(&self, index: usize) -> Option<&str> {
        self.images.get(index).map(String::as_str)
    }

    /// Hands out the next index to process and moves the cursor forward,
    /// wrapping past the last index back to 0.
    pub fn advance(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.images.len();
        index
    }

    /// Records that `index` was processed explicitly, so the next `advance`
    /// continues from the position after it.
    pub fn note_processed(&mut self, index: usize) {
        self.cursor = (index + 1) % self.images.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).expect("create fixture file");
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.png");
        touch(dir.path(), "c.JPG");
        touch(dir.path(), "notes.txt");
        dir
    }

    #[test]
    fn scan_sorts_and_filters_by_extension() {
        let dir = fixture_dir();
        let session =
            ComparisonSession::scan(dir.path(), vec!["gaussian".into()]).expect("scan");
        assert_eq!(session.images(), ["a.png", "b.png", "c.JPG"]);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let dir = fixture_dir();
        assert!(matches!(
            ComparisonSession::scan(dir.path(), vec![]),
            Err(SessionError::EmptySelection)
        ));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ComparisonSession::scan(dir.path(), vec!["gaussian".into()]),
            Err(SessionError::NoImages(_))
        ));
    }

    #[test]
    fn advance_wraps_past_the_last_index() {
        let dir = fixture_dir();
        let mut session =
            ComparisonSession::scan(dir.path(), vec!["gaussian".into()]).expect("scan");
        assert_eq!(session.advance(), 0);
        assert_eq!(session.advance(), 1);
        assert_eq!(session.advance(), 2);
        assert_eq!(session.advance(), 0);
    }

    #[test]
    fn note_processed_repositions_the_cursor() {
        let dir = fixture_dir();
        let mut session =
            ComparisonSession::scan(dir.path(), vec!["gaussian".into()]).expect("scan");
        session.note_processed(2);
        assert_eq!(session.advance(), 0);
        session.note_processed(0);
        assert_eq!(session.advance(), 1);
    }
}
