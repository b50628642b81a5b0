//! Arena-backed directory tree produced by the walker

use std::fmt;
use std::path::PathBuf;

use crate::error::EntryError;

/// Index of a node in the [`FileTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Index of a file in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Path relative to the root, one segment per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(Vec<String>);

impl RelPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

/// Always `/`-separated so reports are identical on every platform.
impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for RelPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// FIFO, socket or device file.
    Special,
}

/// A file selected by the walk.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: EntryId,
    pub rel_path: RelPath,
    pub kind: EntryKind,
    /// Size of the file, or of the link target for symlinks.
    pub size: u64,
    /// Filesystem path the content is read from.
    pub path: PathBuf,
}

/// Why an entry is listed but not followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Symlinked directory that was already expanded through another link.
    AlreadyListed,
    Error(EntryError),
}

impl Exclusion {
    pub fn is_error(&self) -> bool {
        matches!(self, Exclusion::Error(_))
    }

    pub fn label(&self) -> String {
        match self {
            Exclusion::AlreadyListed => "already listed".to_string(),
            Exclusion::Error(err) => err.to_string(),
        }
    }
}

impl From<EntryError> for Exclusion {
    fn from(error: EntryError) -> Self {
        Exclusion::Error(error)
    }
}

#[derive(Debug, Clone)]
pub enum NodeBody {
    Directory {
        children: Vec<NodeId>,
        /// Set when the directory could not be read.
        error: Option<EntryError>,
    },
    File {
        entry: EntryId,
    },
    Excluded(Exclusion),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub rel_path: RelPath,
    pub kind: EntryKind,
    /// Raw target of a symlink, for display.
    pub link_target: Option<String>,
    pub parent: Option<NodeId>,
    pub body: NodeBody,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        matches!(self.body, NodeBody::Directory { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::Directory { children, .. } => children,
            _ => &[],
        }
    }
}

/// Directory shape plus the ordered file list.
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<TreeNode>,
    entries: Vec<FileEntry>,
    root_label: String,
}

impl FileTree {
    pub(crate) fn new(nodes: Vec<TreeNode>, entries: Vec<FileEntry>, root_label: String) -> Self {
        Self {
            nodes,
            entries,
            root_label,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Files in traversal order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> &FileEntry {
        &self.entries[id.0]
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn dir_count(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| n.is_dir()).count()
    }

    pub fn bytes_scanned(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Entries recorded with an error (not counting "already listed" links).
    pub fn error_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| match &n.body {
                NodeBody::Excluded(exclusion) => exclusion.is_error(),
                NodeBody::Directory { error, .. } => error.is_some(),
                NodeBody::File { .. } => false,
            })
            .count()
    }

    /// Look up a node by its relative path.
    pub fn find(&self, rel_path: &str) -> Option<&TreeNode> {
        self.nodes
            .iter()
            .find(|n| n.rel_path.to_string() == rel_path)
    }
}
