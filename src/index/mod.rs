pub mod error;
pub mod types;

pub use error::{IndexError, Result};
pub use types::FileNode;

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

/// Dual path-keyed lookup over a tree of [`FileNode`]s, guarded by one
/// read-write lock so reads never block each other and writes never
/// interleave.
#[derive(Default)]
pub struct FileStructureIndex {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, FileNode>,
    directories: HashMap<String, FileNode>,
    roots: Vec<String>,
}

impl FileStructureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `node` and its descendants breadth-first, indexing each by
    /// path. A path that is already indexed is left untouched (idempotent).
    pub fn add_node(&self, node: FileNode) -> Result<()> {
        let mut inner = self.inner.write();
        let mut queue = VecDeque::new();
        queue.push_back(node);
        let mut first = true;

        while let Some(n) = queue.pop_front() {
            if first {
                inner.roots.push(n.path.clone());
                first = false;
            }
            if n.is_directory {
                if !inner.directories.contains_key(&n.path) {
                    for child in n.children.clone() {
                        queue.push_back(child);
                    }
                    inner.directories.insert(n.path.clone(), n);
                }
            } else if !inner.files.contains_key(&n.path) {
                inner.files.insert(n.path.clone(), n);
            }
        }
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Option<FileNode> {
        self.inner.read().files.get(path).cloned()
    }

    pub fn get_directory(&self, path: &str) -> Option<FileNode> {
        self.inner.read().directories.get(path).cloned()
    }

    pub fn all_files(&self) -> Vec<FileNode> {
        self.inner.read().files.values().cloned().collect()
    }

    pub fn all_directories(&self) -> Vec<FileNode> {
        self.inner.read().directories.values().cloned().collect()
    }

    pub fn file_count(&self) -> usize {
        self.inner.read().files.len()
    }

    pub fn directory_count(&self) -> usize {
        self.inner.read().directories.len()
    }

    pub fn total_size(&self) -> u64 {
        self.inner.read().files.values().map(|f| f.size).sum()
    }

    pub fn contains(&self, path: &str) -> bool {
        let inner = self.inner.read();
        inner.files.contains_key(path) || inner.directories.contains_key(path)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.files.clear();
        inner.directories.clear();
        inner.roots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_indexes_files_and_directories() {
        let idx = FileStructureIndex::new();
        let tree = FileNode::directory(
            "/root",
            "root",
            vec![
                FileNode::file("/root/a.txt", "a.txt", 10),
                FileNode::file("/root/b.txt", "b.txt", 20),
            ],
        );
        idx.add_node(tree).unwrap();

        assert_eq!(idx.file_count(), 2);
        assert_eq!(idx.directory_count(), 1);
        assert_eq!(idx.total_size(), 30);
        assert!(idx.get_file("/root/a.txt").is_some());
        assert!(idx.get_directory("/root").is_some());
    }

    #[test]
    fn add_node_is_idempotent() {
        let idx = FileStructureIndex::new();
        idx.add_node(FileNode::file("/a.txt", "a.txt", 5)).unwrap();
        idx.add_node(FileNode::file("/a.txt", "a.txt", 999)).unwrap();

        assert_eq!(idx.file_count(), 1);
        assert_eq!(idx.get_file("/a.txt").unwrap().size, 5);
    }

    #[test]
    fn clear_empties_everything() {
        let idx = FileStructureIndex::new();
        idx.add_node(FileNode::file("/a.txt", "a.txt", 5)).unwrap();
        idx.clear();
        assert_eq!(idx.file_count(), 0);
    }
}
