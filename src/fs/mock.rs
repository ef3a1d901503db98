use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MockEntry {
    content: Option<String>,
    file_type: FileType,
    unreadable: bool,
}

impl MockEntry {
    fn dir() -> Self {
        Self {
            content: None,
            file_type: FileType::Directory,
            unreadable: false,
        }
    }
}

/// In-memory project tree rooted at `/mock` unless another root is given.
/// Relative paths are resolved against the root.
#[derive(Debug)]
pub struct MockFileSystem {
    entries: RwLock<BTreeMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        let fs = Self {
            entries: RwLock::new(BTreeMap::new()),
            root,
        };
        fs.add_dir(fs.root.clone());
        fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        self.insert_file(path.as_ref(), Some(content.to_string()), false);
    }

    /// Adds a file whose reads always fail, for exercising detector isolation
    pub fn add_unreadable_file(&self, path: impl AsRef<Path>) {
        self.insert_file(path.as_ref(), None, true);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.resolve(path.as_ref());
        Self::ensure_dirs(&mut self.write(), &path);
    }

    fn insert_file(&self, path: &Path, content: Option<String>, unreadable: bool) {
        let path = self.resolve(path);
        let mut entries = self.write();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(
            path,
            MockEntry {
                content,
                file_type: FileType::File,
                unreadable,
            },
        );
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries.entry(ancestor.to_path_buf()).or_insert_with(MockEntry::dir);
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn kind(&self, path: &Path) -> Option<FileType> {
        self.read().get(&self.resolve(path)).map(|e| e.file_type)
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind(path) == Some(FileType::Directory)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.kind(path) == Some(FileType::File)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.resolve(path);
        let entries = self.read();
        let entry = entries
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {}", path.display()))?;

        if entry.unreadable {
            return Err(anyhow!("Permission denied: {}", path.display()));
        }
        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.resolve(path);
        let entries = self.read();

        if !entries.contains_key(&path) {
            return Err(anyhow!("Directory not found: {}", path.display()));
        }

        Ok(entries
            .iter()
            .filter(|(child, _)| child.parent() == Some(path.as_path()))
            .map(|(child, entry)| DirEntry {
                path: child.clone(),
                name: child
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string(),
                file_type: entry.file_type,
            })
            .collect())
    }
}
