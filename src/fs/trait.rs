//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Directory names never descended into while walking a project
pub const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "vendor",
    "dist",
    "build",
    ".venv",
    "venv",
    "__pycache__",
    ".terraform",
];

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// Abstraction over read-only file system operations for testability
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// List directory contents
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Lists files under `root` up to `max_depth` levels, sorted by path.
    ///
    /// Unreadable directories are skipped, as are the entries in [`SKIPPED_DIRS`].
    fn walk_files(&self, root: &Path, max_depth: usize) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut pending = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = pending.pop() {
            let Ok(entries) = self.read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                match entry.file_type() {
                    FileType::File => files.push(entry.path),
                    FileType::Directory => {
                        if depth + 1 < max_depth && !SKIPPED_DIRS.contains(&entry.file_name()) {
                            pending.push((entry.path, depth + 1));
                        }
                    }
                    FileType::Symlink => {}
                }
            }
        }

        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_dir_entry() {
        let entry = DirEntry {
            path: PathBuf::from("/test/file.txt"),
            name: "file.txt".to_string(),
            file_type: FileType::File,
        };
        assert_eq!(entry.path(), Path::new("/test/file.txt"));
        assert_eq!(entry.file_name(), "file.txt");
        assert_eq!(entry.file_type(), FileType::File);
    }

    #[test]
    fn test_walk_files_respects_depth_and_skips() {
        let fs = MockFileSystem::new();
        fs.add_file("main.tf", "");
        fs.add_file("infra/network/main.tf", "");
        fs.add_file("node_modules/pkg/index.js", "");
        fs.add_file("a/b/c/d/deep.tf", "");

        let files = fs.walk_files(Path::new("/mock"), 3);

        assert!(files.contains(&PathBuf::from("/mock/main.tf")));
        assert!(files.contains(&PathBuf::from("/mock/infra/network/main.tf")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("node_modules")));
        assert!(!files.iter().any(|p| p.ends_with("deep.tf")));
    }

    #[test]
    fn test_walk_files_sorted() {
        let fs = MockFileSystem::new();
        fs.add_file("z.txt", "");
        fs.add_file("a.txt", "");

        let files = fs.walk_files(Path::new("/mock"), 1);
        assert_eq!(
            files,
            vec![PathBuf::from("/mock/a.txt"), PathBuf::from("/mock/z.txt")]
        );
    }
}
