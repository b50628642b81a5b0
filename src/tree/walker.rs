//! TreeWalker - iterative depth-first walk into an arena-backed tree

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::gitignore::Gitignore;
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::error::{EntryError, FosumError, Result};

use super::filter::{PathFilter, git_ignored};
use super::node::{
    EntryId, EntryKind, Exclusion, FileEntry, FileTree, NodeBody, NodeId, RelPath, TreeNode,
};

/// Directory waiting to be read.
struct PendingDir {
    node: NodeId,
    path: PathBuf,
}

/// Symlink to a directory inside the root, followed only if its target is
/// not reached any other way.
struct DeferredLink {
    node: NodeId,
    path: PathBuf,
    target: PathBuf,
}

/// File recorded during the walk, numbered once the tree is complete.
struct PendingFile {
    rel_path: RelPath,
    kind: EntryKind,
    size: u64,
    path: PathBuf,
}

/// Walks a directory without recursion. Children are visited in
/// lexicographic order, so the same tree always yields the same result.
///
/// Real directories are walked first. Directory symlinks are resolved
/// afterwards in path order, so a link is only expanded when its target was
/// not already listed, wherever the two sort.
pub struct TreeWalker<'a> {
    filter: &'a PathFilter,
    max_depth: Option<usize>,
    cancel: Cancellation,
}

impl<'a> TreeWalker<'a> {
    pub fn new(filter: &'a PathFilter) -> Self {
        Self {
            filter,
            max_depth: None,
            cancel: Cancellation::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walk `root`. Only a missing or unreadable root is fatal; every other
    /// failure is recorded on the affected node.
    pub fn walk(&self, root: &Path) -> Result<FileTree> {
        let metadata = fs::metadata(root).map_err(|e| FosumError::root(root, e))?;
        if !metadata.is_dir() {
            return Err(FosumError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let canonical_root = root.canonicalize().map_err(|e| FosumError::root(root, e))?;
        let root_children = read_sorted(root).map_err(|e| FosumError::root(root, e))?;

        let mut state = WalkState::new(canonical_root);
        let mut stack = Vec::new();
        let root_id = state.root();
        self.expand(&mut state, root_id, root, root_children, &mut stack);

        loop {
            while let Some(dir) = stack.pop() {
                self.cancel.check()?;
                match read_sorted(&dir.path) {
                    Ok(children) => {
                        self.expand(&mut state, dir.node, &dir.path, children, &mut stack)
                    }
                    Err(err) => {
                        let error = EntryError::io(&err);
                        warn!(path = %dir.path.display(), %error, "cannot read directory");
                        state.set_dir_error(dir.node, error);
                    }
                }
            }

            let Some(link) = state.next_deferred() else {
                break;
            };
            self.cancel.check()?;
            if state.expanded.insert(link.target.clone()) {
                debug!(path = %link.path.display(), "following directory symlink");
                state.open_link(link.node, link.target);
                stack.push(PendingDir {
                    node: link.node,
                    path: link.path,
                });
            }
        }

        Ok(state.finish(root_label(root)))
    }

    /// Add the children of `dir` and schedule sub-directories so that the
    /// first child is read next.
    fn expand(
        &self,
        state: &mut WalkState,
        dir: NodeId,
        dir_path: &Path,
        children: Vec<(String, PathBuf)>,
        stack: &mut Vec<PendingDir>,
    ) {
        let depth = state.nodes[dir.0].rel_path.depth();
        if self.max_depth.is_some_and(|max| depth >= max) {
            debug!(path = %dir_path.display(), "depth limit reached");
            return;
        }

        let canonical = state.canonical_of(dir).to_path_buf();
        let rules = self.filter.load_ignore_rules(&canonical, dir == state.root());
        state.rules[dir.0] = rules;

        let mut subdirs = Vec::new();
        for (name, path) in children {
            if let Some(pending) = self.add_child(state, dir, name, path) {
                subdirs.push(pending);
            }
        }
        stack.extend(subdirs.into_iter().rev());
    }

    /// Path filter plus the `.gitignore` rules of every directory above.
    fn include(&self, state: &WalkState, parent: NodeId, rel_path: &RelPath, kind: EntryKind) -> bool {
        self.filter.should_include(rel_path, kind)
            && !state.git_ignored(parent, rel_path, kind == EntryKind::Directory)
    }

    fn add_child(
        &self,
        state: &mut WalkState,
        parent: NodeId,
        name: String,
        path: PathBuf,
    ) -> Option<PendingDir> {
        let rel_path = state.nodes[parent.0].rel_path.join(name.clone());

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                if self.include(state, parent, &rel_path, EntryKind::File) {
                    let error = EntryError::io(&err);
                    warn!(path = %path.display(), %error, "cannot stat entry");
                    state.push_excluded(parent, name, rel_path, EntryKind::File, None, error.into());
                }
                return None;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            self.add_symlink(state, parent, name, rel_path, path);
            return None;
        }

        if file_type.is_dir() {
            if !self.include(state, parent, &rel_path, EntryKind::Directory) {
                return None;
            }
            let canonical = state.canonical_of(parent).join(&name);
            if !state.expanded.insert(canonical.clone()) {
                // Already expanded through a symlink
                state.push_excluded(
                    parent,
                    name,
                    rel_path,
                    EntryKind::Directory,
                    None,
                    Exclusion::AlreadyListed,
                );
                return None;
            }
            let node = state.push_dir(parent, name, rel_path, EntryKind::Directory, None, canonical);
            return Some(PendingDir { node, path });
        }

        if !self.include(state, parent, &rel_path, EntryKind::File) {
            return None;
        }
        if file_type.is_file() {
            state.push_file(parent, name, rel_path, EntryKind::File, None, metadata.len(), path);
        } else {
            // FIFOs, sockets and devices; the read timeout decides what they show
            debug!(path = %path.display(), "special file");
            state.push_file(parent, name, rel_path, EntryKind::Special, None, 0, path);
        }
        None
    }

    /// Resolve a symlink one level and decide whether to follow it.
    fn add_symlink(
        &self,
        state: &mut WalkState,
        parent: NodeId,
        name: String,
        rel_path: RelPath,
        path: PathBuf,
    ) {
        let link_target = fs::read_link(&path)
            .ok()
            .map(|t| t.to_string_lossy().into_owned());

        let target = match fs::canonicalize(&path) {
            Ok(target) => target,
            Err(err) => {
                if self.include(state, parent, &rel_path, EntryKind::File) {
                    let error = symlink_error(&err);
                    warn!(path = %path.display(), %error, "cannot resolve symlink");
                    state.push_excluded(parent, name, rel_path, EntryKind::Symlink, link_target, error.into());
                }
                return;
            }
        };

        let target_metadata = match fs::metadata(&target) {
            Ok(m) => m,
            Err(err) => {
                if self.include(state, parent, &rel_path, EntryKind::File) {
                    let error = EntryError::io(&err);
                    state.push_excluded(parent, name, rel_path, EntryKind::Symlink, link_target, error.into());
                }
                return;
            }
        };

        let resolved_kind = if target_metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        if !self.include(state, parent, &rel_path, resolved_kind) {
            return;
        }

        if !target.starts_with(&state.canonical_root) {
            debug!(path = %path.display(), target = %target.display(), "symlink leaves root");
            state.push_excluded(
                parent,
                name,
                rel_path,
                EntryKind::Symlink,
                link_target,
                EntryError::OutsideRoot.into(),
            );
            return;
        }

        if target_metadata.is_dir() {
            if state.is_ancestor(parent, &target) {
                warn!(path = %path.display(), "cyclic symlink not followed");
                state.push_excluded(
                    parent,
                    name,
                    rel_path,
                    EntryKind::Symlink,
                    link_target,
                    EntryError::CyclicSymlink.into(),
                );
                return;
            }
            // Listed as already seen until the deferred pass decides otherwise
            let node = state.push_excluded(
                parent,
                name,
                rel_path,
                EntryKind::Symlink,
                link_target,
                Exclusion::AlreadyListed,
            );
            state.deferred.push(DeferredLink { node, path, target });
            return;
        }

        let (kind, size) = if target_metadata.is_file() {
            (EntryKind::Symlink, target_metadata.len())
        } else {
            (EntryKind::Special, 0)
        };
        state.push_file(parent, name, rel_path, kind, link_target, size, path);
    }
}

/// Arena under construction.
struct WalkState {
    nodes: Vec<TreeNode>,
    /// Canonical path per directory node, `None` for other nodes.
    canonical: Vec<Option<PathBuf>>,
    /// Ignore rules defined in each directory node.
    rules: Vec<Option<Gitignore>>,
    canonical_root: PathBuf,
    /// Canonical paths of every directory added so far.
    expanded: HashSet<PathBuf>,
    deferred: Vec<DeferredLink>,
    files: Vec<PendingFile>,
}

impl WalkState {
    fn new(canonical_root: PathBuf) -> Self {
        let root = TreeNode {
            name: String::new(),
            rel_path: RelPath::root(),
            kind: EntryKind::Directory,
            link_target: None,
            parent: None,
            body: NodeBody::Directory {
                children: Vec::new(),
                error: None,
            },
        };
        let mut expanded = HashSet::new();
        expanded.insert(canonical_root.clone());
        Self {
            nodes: vec![root],
            canonical: vec![Some(canonical_root.clone())],
            rules: vec![None],
            canonical_root,
            expanded,
            deferred: Vec::new(),
            files: Vec::new(),
        }
    }

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn canonical_of(&self, id: NodeId) -> &Path {
        self.canonical[id.0]
            .as_deref()
            .unwrap_or(self.canonical_root.as_path())
    }

    /// True if `target` is `dir` or one of its ancestors.
    fn is_ancestor(&self, dir: NodeId, target: &Path) -> bool {
        let mut current = Some(dir);
        while let Some(id) = current {
            if self.canonical[id.0].as_deref() == Some(target) {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Check `rel_path` against the ignore rules from `parent` up to the root.
    fn git_ignored(&self, parent: NodeId, rel_path: &RelPath, is_dir: bool) -> bool {
        let mut chain = Vec::new();
        let mut current = Some(parent);
        while let Some(id) = current {
            if let Some(rules) = &self.rules[id.0] {
                let depth = self.nodes[id.0].rel_path.depth();
                chain.push((rules, rel_path.segments()[depth..].join("/")));
            }
            current = self.nodes[id.0].parent;
        }
        git_ignored(chain, is_dir)
    }

    /// Deferred link that comes first in path order.
    fn next_deferred(&mut self) -> Option<DeferredLink> {
        let index = self
            .deferred
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                self.nodes[a.node.0]
                    .rel_path
                    .cmp(&self.nodes[b.node.0].rel_path)
            })
            .map(|(index, _)| index)?;
        Some(self.deferred.swap_remove(index))
    }

    /// Turn a deferred link into a directory to be expanded.
    fn open_link(&mut self, node: NodeId, target: PathBuf) {
        self.nodes[node.0].body = NodeBody::Directory {
            children: Vec::new(),
            error: None,
        };
        self.canonical[node.0] = Some(target);
    }

    fn push(&mut self, parent: NodeId, node: TreeNode, canonical: Option<PathBuf>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.canonical.push(canonical);
        self.rules.push(None);
        if let NodeBody::Directory { children, .. } = &mut self.nodes[parent.0].body {
            children.push(id);
        }
        id
    }

    fn push_dir(
        &mut self,
        parent: NodeId,
        name: String,
        rel_path: RelPath,
        kind: EntryKind,
        link_target: Option<String>,
        canonical: PathBuf,
    ) -> NodeId {
        let node = TreeNode {
            name,
            rel_path,
            kind,
            link_target,
            parent: Some(parent),
            body: NodeBody::Directory {
                children: Vec::new(),
                error: None,
            },
        };
        self.push(parent, node, Some(canonical))
    }

    #[allow(clippy::too_many_arguments)]
    fn push_file(
        &mut self,
        parent: NodeId,
        name: String,
        rel_path: RelPath,
        kind: EntryKind,
        link_target: Option<String>,
        size: u64,
        path: PathBuf,
    ) {
        let pending = EntryId(self.files.len());
        self.files.push(PendingFile {
            rel_path: rel_path.clone(),
            kind,
            size,
            path,
        });
        let node = TreeNode {
            name,
            rel_path,
            kind,
            link_target,
            parent: Some(parent),
            body: NodeBody::File { entry: pending },
        };
        self.push(parent, node, None);
    }

    fn push_excluded(
        &mut self,
        parent: NodeId,
        name: String,
        rel_path: RelPath,
        kind: EntryKind,
        link_target: Option<String>,
        exclusion: Exclusion,
    ) -> NodeId {
        let node = TreeNode {
            name,
            rel_path,
            kind,
            link_target,
            parent: Some(parent),
            body: NodeBody::Excluded(exclusion),
        };
        self.push(parent, node, None)
    }

    fn set_dir_error(&mut self, dir: NodeId, entry_error: EntryError) {
        if let NodeBody::Directory { error, .. } = &mut self.nodes[dir.0].body {
            *error = Some(entry_error);
        }
    }

    /// Number files in pre-order so the file list matches the outline.
    fn finish(mut self, root_label: String) -> FileTree {
        let mut pending: Vec<Option<PendingFile>> = self.files.into_iter().map(Some).collect();
        let mut entries = Vec::with_capacity(pending.len());
        let mut stack = vec![NodeId(0)];

        while let Some(id) = stack.pop() {
            match &mut self.nodes[id.0].body {
                NodeBody::File { entry } => {
                    if let Some(file) = pending[entry.0].take() {
                        let new_id = EntryId(entries.len());
                        *entry = new_id;
                        entries.push(FileEntry {
                            id: new_id,
                            rel_path: file.rel_path,
                            kind: file.kind,
                            size: file.size,
                            path: file.path,
                        });
                    }
                }
                NodeBody::Directory { children, .. } => {
                    stack.extend(children.iter().rev().copied());
                }
                NodeBody::Excluded(_) => {}
            }
        }

        FileTree::new(self.nodes, entries, root_label)
    }
}

/// Read a directory, sorted by file name.
fn read_sorted(path: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut entries: Vec<_> = fs::read_dir(path)?
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                None
            }
        })
        .collect();
    entries.sort_by_key(|a| a.file_name());

    Ok(entries
        .into_iter()
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect())
}

/// Name shown at the top of the outline.
fn root_label(root: &Path) -> String {
    root.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// Classify a failure to resolve a symlink.
fn symlink_error(err: &io::Error) -> EntryError {
    match err.kind() {
        io::ErrorKind::NotFound => EntryError::BrokenSymlink,
        io::ErrorKind::PermissionDenied => EntryError::PermissionDenied,
        _ if is_symlink_loop(err) => EntryError::CyclicSymlink,
        _ => EntryError::Io(err.to_string()),
    }
}

fn is_symlink_loop(err: &io::Error) -> bool {
    #[cfg(target_os = "linux")]
    const ELOOP: i32 = 40;
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    const ELOOP: i32 = 62;

    #[cfg(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        err.raw_os_error() == Some(ELOOP)
    }
    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )))]
    {
        let _ = err;
        false
    }
}
