use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::category::MediaCategory;

/// Ordered, duplicate-free list of files picked for one category.
///
/// Paths are compared as given; `a.png` and `./a.png` are different entries.
#[derive(Debug, Clone)]
pub struct FileSelection {
    category: MediaCategory,
    files: Vec<PathBuf>,
}

impl FileSelection {
    pub fn new(category: MediaCategory) -> Self {
        Self {
            category,
            files: Vec::new(),
        }
    }

    pub fn category(&self) -> MediaCategory {
        self.category
    }

    /// Add `path` unless it is already selected. Returns whether it was added.
    pub fn add<P: Into<PathBuf>>(&mut self, path: P) -> bool {
        let path = path.into();
        if self.files.contains(&path) {
            debug!("Skipping duplicate selection {}", path.display());
            return false;
        }
        self.files.push(path);
        true
    }

    /// Add every file under `dir` whose extension the category accepts,
    /// in file name order. Returns how many were added.
    pub fn add_dir<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        let category = self.category;
        let candidates: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && category.accepts(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        candidates.into_iter().filter(|path| self.add(path.clone())).count()
    }

    pub fn remove<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let before = self.files.len();
        self.files.retain(|file| file != path.as_ref());
        self.files.len() != before
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
