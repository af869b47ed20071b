use serde::{Deserialize, Serialize};

/// A node in the file tree the engine was asked to transfer — either a leaf
/// file or a directory with children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub checksum: String,
    pub is_directory: bool,
    #[serde(default)]
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn file(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            checksum: String::new(),
            is_directory: false,
            children: Vec::new(),
        }
    }

    pub fn directory(path: impl Into<String>, name: impl Into<String>, children: Vec<FileNode>) -> Self {
        let size = children.iter().map(|c| c.size).sum();
        Self {
            path: path.into(),
            name: name.into(),
            size,
            checksum: String::new(),
            is_directory: true,
            children,
        }
    }
}
