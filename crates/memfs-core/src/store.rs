// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The namespace store: a tree of named nodes behind one lock
//!
//! All structural operations (lookup, create, unlink, rmdir, link, readdir)
//! and file content I/O take the store lock for their full duration. Nothing
//! releases and reacquires it mid-traversal, so callers never observe a
//! half-applied mutation. Node handles are inode numbers resolved through the
//! node table under that same lock; a handle kept past the node's last unlink
//! resolves to `NotFound` rather than to freed memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::{FsError, FsResult};
use crate::types::{Attributes, DirEntry, FileTimes, NodeId, NodeType, StoreStats};

/// Well-known inode number of the root directory.
pub const ROOT_INO: u64 = 1000;

/// First inode number handed to dynamically created nodes.
const FIRST_DYNAMIC_INO: u64 = 1001;

/// Node payload
#[derive(Clone, Debug)]
enum NodeKind {
    File {
        content: Vec<u8>,
    },
    Directory {
        /// `(name, ino)` pairs in creation order
        children: Vec<(String, NodeId)>,
    },
}

/// A single namespace entry
#[derive(Clone, Debug)]
struct Node {
    ino: NodeId,
    kind: NodeKind,
    mode: u32,
    /// Directory that created this node, `None` only for the root. Consulted
    /// for path reconstruction in diagnostics, never for destruction order.
    parent: Option<NodeId>,
    /// Names currently referring to this node. Directories always have
    /// exactly one.
    nlink: u32,
    times: FileTimes,
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Directory { .. } => NodeType::Directory,
            NodeKind::File { .. } => NodeType::File,
        }
    }

    fn content_len(&self) -> u64 {
        match &self.kind {
            NodeKind::File { content } => content.len() as u64,
            NodeKind::Directory { .. } => 0,
        }
    }
}

/// Tree state guarded by the store lock: the node table plus the inode
/// allocator. Keeping both behind one mutex makes every operation a single
/// bounded critical section.
struct StoreInner {
    nodes: HashMap<NodeId, Node>,
    next_ino: u64,
}

impl StoreInner {
    fn alloc_ino(&mut self) -> NodeId {
        let ino = NodeId(self.next_ino);
        self.next_ino += 1;
        ino
    }

    fn dir_children(&self, dir: NodeId) -> FsResult<&Vec<(String, NodeId)>> {
        let node = self.nodes.get(&dir).ok_or(FsError::NotFound)?;
        match &node.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::NotADirectory),
        }
    }

    fn dir_children_mut(&mut self, dir: NodeId) -> FsResult<&mut Vec<(String, NodeId)>> {
        let node = self.nodes.get_mut(&dir).ok_or(FsError::NotFound)?;
        match &mut node.kind {
            NodeKind::Directory { children } => Ok(children),
            NodeKind::File { .. } => Err(FsError::NotADirectory),
        }
    }

    fn find_child(&self, dir: NodeId, name: &str) -> FsResult<(usize, NodeId)> {
        let children = self.dir_children(dir)?;
        let idx = children
            .iter()
            .position(|(n, _)| n.as_str() == name)
            .ok_or(FsError::NotFound)?;
        Ok((idx, children[idx].1))
    }

    /// Remove a node from the table, children before parent, releasing
    /// content buffers and entry names as each node goes.
    fn release_recursive(&mut self, ino: NodeId) {
        if let Some(node) = self.nodes.remove(&ino) {
            if let NodeKind::Directory { children } = node.kind {
                for (_, child) in children {
                    self.release_recursive(child);
                }
            }
        }
    }

    /// Best-effort path reconstruction by walking parent links. Returns
    /// `None` when a link on the way up no longer resolves, e.g. for a
    /// hard-linked file whose original name was unlinked.
    fn path_of(&self, ino: NodeId) -> Option<String> {
        let mut segments = Vec::new();
        let mut cur = ino;
        while cur != NodeId(ROOT_INO) {
            let parent = self.nodes.get(&cur)?.parent?;
            let (name, _) = self
                .dir_children(parent)
                .ok()?
                .iter()
                .find(|(_, child)| *child == cur)?;
            segments.push(name.clone());
            cur = parent;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }
}

/// The in-memory namespace store backing one mount.
///
/// Owns the whole node tree and its concurrency control. Adapters hold an
/// `FsStore` per mount, call into it with [`NodeId`] handles, and wrap the
/// results in host-visible objects.
pub struct FsStore {
    config: StoreConfig,
    inner: Mutex<StoreInner>,
}

impl FsStore {
    /// Create a store with a fresh root directory. The root gets the
    /// well-known inode number [`ROOT_INO`]; dynamically created nodes start
    /// above it and inode numbers are never reused within one store.
    pub fn new(config: StoreConfig) -> FsResult<Self> {
        let now = current_timestamp();
        let root = Node {
            ino: NodeId(ROOT_INO),
            kind: NodeKind::Directory {
                children: Vec::new(),
            },
            mode: config.root_mode,
            parent: None,
            nlink: 1,
            times: FileTimes {
                mtime: now,
                ctime: now,
            },
        };

        let mut nodes = HashMap::new();
        nodes.insert(root.ino, root);

        Ok(Self {
            config,
            inner: Mutex::new(StoreInner {
                nodes,
                next_ino: FIRST_DYNAMIC_INO,
            }),
        })
    }

    /// Handle of the root directory. Always succeeds; the root is never
    /// deleted while the store is alive.
    pub fn root(&self) -> NodeId {
        NodeId(ROOT_INO)
    }

    /// Find `name` among the immediate children of `parent`. Resolution of
    /// `.` and `..` is the adapter's business, not the store's.
    pub fn lookup(&self, parent: NodeId, name: &str) -> FsResult<Option<NodeId>> {
        let inner = self.inner.lock().unwrap();
        let children = inner.dir_children(parent)?;
        Ok(children
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|&(_, ino)| ino))
    }

    /// Create a new file or directory under `parent`. The new entry is
    /// appended to the parent's child list, so enumeration order is creation
    /// order.
    pub fn create(
        &self,
        parent: NodeId,
        name: &str,
        kind: NodeType,
        mode: u32,
    ) -> FsResult<NodeId> {
        self.validate_name(name)?;

        let mut inner = self.inner.lock().unwrap();
        if inner.dir_children(parent)?.iter().any(|(n, _)| n.as_str() == name) {
            return Err(FsError::AlreadyExists);
        }

        let ino = inner.alloc_ino();
        let now = current_timestamp();
        let node = Node {
            ino,
            kind: match kind {
                NodeType::Directory => NodeKind::Directory {
                    children: Vec::new(),
                },
                NodeType::File => NodeKind::File {
                    content: Vec::new(),
                },
            },
            mode,
            parent: Some(parent),
            nlink: 1,
            times: FileTimes {
                mtime: now,
                ctime: now,
            },
        };

        inner.nodes.insert(ino, node);
        inner.dir_children_mut(parent)?.push((name.to_owned(), ino));

        debug!(parent = parent.0, name, ino = ino.0, ?kind, "create");
        Ok(ino)
    }

    /// Remove the name `name` from `parent`. The target must be a file; its
    /// link count drops by one and the node is released when no name refers
    /// to it anymore. Two racing unlinks of the same name resolve to one
    /// success and one `NotFound`.
    pub fn unlink(&self, parent: NodeId, name: &str) -> FsResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let (idx, ino) = inner.find_child(parent, name)?;

        if inner.nodes.get(&ino).ok_or(FsError::NotFound)?.is_dir() {
            return Err(FsError::IsADirectory);
        }

        inner.dir_children_mut(parent)?.remove(idx);

        let now = current_timestamp();
        let remaining = {
            let node = inner.nodes.get_mut(&ino).ok_or(FsError::NotFound)?;
            node.nlink = node.nlink.saturating_sub(1);
            node.times.ctime = now;
            node.nlink
        };
        if remaining == 0 {
            inner.release_recursive(ino);
        }

        debug!(parent = parent.0, name, ino = ino.0, nlink = remaining, "unlink");
        Ok(())
    }

    /// Remove the empty directory `name` from `parent`.
    pub fn rmdir(&self, parent: NodeId, name: &str) -> FsResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let (idx, ino) = inner.find_child(parent, name)?;

        match &inner.nodes.get(&ino).ok_or(FsError::NotFound)?.kind {
            NodeKind::Directory { children } => {
                if !children.is_empty() {
                    return Err(FsError::NotEmpty);
                }
            }
            NodeKind::File { .. } => return Err(FsError::NotADirectory),
        }

        inner.dir_children_mut(parent)?.remove(idx);
        inner.release_recursive(ino);

        debug!(parent = parent.0, name, ino = ino.0, "rmdir");
        Ok(())
    }

    /// Give the file `src_name` (under `src_parent`) the additional name
    /// `new_name` under `new_parent`. Both names refer to the same node
    /// afterwards; directories cannot be hard-linked.
    pub fn link(
        &self,
        src_parent: NodeId,
        src_name: &str,
        new_parent: NodeId,
        new_name: &str,
    ) -> FsResult<NodeId> {
        self.validate_name(new_name)?;

        let mut inner = self.inner.lock().unwrap();
        let (_, src_ino) = inner.find_child(src_parent, src_name)?;

        if inner.nodes.get(&src_ino).ok_or(FsError::NotFound)?.is_dir() {
            return Err(FsError::IsADirectory);
        }
        if inner.dir_children(new_parent)?.iter().any(|(n, _)| n.as_str() == new_name) {
            return Err(FsError::AlreadyExists);
        }

        inner.dir_children_mut(new_parent)?.push((new_name.to_owned(), src_ino));

        let now = current_timestamp();
        if let Some(node) = inner.nodes.get_mut(&src_ino) {
            node.nlink += 1;
            node.times.ctime = now;
        }

        debug!(
            parent = new_parent.0,
            name = new_name,
            ino = src_ino.0,
            "link"
        );
        Ok(src_ino)
    }

    /// List the children of `dir` in creation order, starting at index
    /// `pos`. The whole slice is materialized under one lock hold, so a
    /// single call always reflects a consistent tree state.
    ///
    /// The store keeps no cursor: repeated calls with increasing `pos` are
    /// mutually consistent only while no entry before the offset is inserted
    /// or removed in between. Synthetic `.` and `..` entries are the
    /// adapter's business and are never emitted here.
    pub fn readdir(&self, dir: NodeId, pos: usize) -> FsResult<Vec<DirEntry>> {
        let inner = self.inner.lock().unwrap();
        let children = inner.dir_children(dir)?;

        let mut entries = Vec::with_capacity(children.len().saturating_sub(pos));
        for (name, ino) in children.iter().skip(pos) {
            let node = inner.nodes.get(ino).ok_or(FsError::NotFound)?;
            entries.push(DirEntry {
                name: name.clone(),
                ino: ino.0,
                kind: node.node_type(),
            });
        }
        Ok(entries)
    }

    /// Read file content starting at `offset` into `buf`. The length is
    /// clamped to what the file holds; reading at or past the end returns
    /// `Ok(0)`, never an error.
    pub fn read(&self, file: NodeId, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        let inner = self.inner.lock().unwrap();
        let node = inner.nodes.get(&file).ok_or(FsError::NotFound)?;
        let content = match &node.kind {
            NodeKind::File { content } => content,
            NodeKind::Directory { .. } => return Err(FsError::IsADirectory),
        };

        let start = offset as usize;
        if start >= content.len() {
            return Ok(0);
        }
        let end = std::cmp::min(start + buf.len(), content.len());
        let n = end - start;
        buf[..n].copy_from_slice(&content[start..end]);
        Ok(n)
    }

    /// Write `data` to the file at `offset`, growing the content as needed.
    ///
    /// With `append` set, the caller-supplied offset is ignored and the
    /// write lands at the current end of the file.
    ///
    /// Contract note: a write whose effective offset is 0 replaces the whole
    /// content, it does not overwrite in place. The driver this store backs
    /// depends on that behavior. Writing past the end zero-fills the gap.
    ///
    /// Growth allocates fallibly; on `OutOfMemory` the prior content is left
    /// unmodified.
    pub fn write(&self, file: NodeId, offset: u64, data: &[u8], append: bool) -> FsResult<usize> {
        let mut inner = self.inner.lock().unwrap();
        let node = inner.nodes.get_mut(&file).ok_or(FsError::NotFound)?;
        let content = match &mut node.kind {
            NodeKind::File { content } => content,
            NodeKind::Directory { .. } => return Err(FsError::IsADirectory),
        };

        let pos = if append { content.len() } else { offset as usize };
        if pos == 0 {
            // Whole-buffer reset, built up front so failure leaves the old
            // content in place.
            let mut fresh = Vec::new();
            fresh.try_reserve_exact(data.len())?;
            fresh.extend_from_slice(data);
            *content = fresh;
        } else {
            let end = pos + data.len();
            if end > content.len() {
                content.try_reserve(end - content.len())?;
                content.resize(end, 0);
            }
            content[pos..end].copy_from_slice(data);
        }

        let now = current_timestamp();
        node.times.mtime = now;
        node.times.ctime = now;

        trace!(ino = file.0, pos, len = data.len(), "write");
        Ok(data.len())
    }

    /// Attributes of any live node.
    pub fn getattr(&self, node: NodeId) -> FsResult<Attributes> {
        let inner = self.inner.lock().unwrap();
        let n = inner.nodes.get(&node).ok_or(FsError::NotFound)?;
        Ok(Attributes {
            ino: n.ino.0,
            kind: n.node_type(),
            mode: n.mode,
            nlink: n.nlink,
            len: n.content_len(),
            times: n.times,
        })
    }

    /// Best-effort absolute path of a node, for diagnostics. Fails with
    /// `NotFound` when the walk up to the root no longer resolves, e.g. for
    /// a hard link whose creating name was removed.
    pub fn path_of(&self, node: NodeId) -> FsResult<String> {
        let inner = self.inner.lock().unwrap();
        inner.path_of(node).ok_or(FsError::NotFound)
    }

    /// Live node count and resident content bytes.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock().unwrap();
        let bytes_in_memory = inner.nodes.values().map(Node::content_len).sum();
        StoreStats {
            nodes: inner.nodes.len() as u64,
            bytes_in_memory,
        }
    }

    /// Release every node depth-first, children before parent. Exclusive
    /// access is encoded by `&mut self`; call once at end of the mount's
    /// life. Afterwards every operation fails with `NotFound`. Dropping the
    /// store releases the same memory without an explicit call.
    pub fn teardown(&mut self) {
        let inner = self.inner.get_mut().unwrap();
        debug!(nodes = inner.nodes.len(), "teardown");
        inner.release_recursive(NodeId(ROOT_INO));
    }

    fn validate_name(&self, name: &str) -> FsResult<()> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::InvalidName);
        }
        if name.len() > self.config.limits.max_name_len {
            return Err(FsError::InvalidName);
        }
        if name.contains('/') || name.contains('\0') {
            return Err(FsError::InvalidName);
        }
        Ok(())
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FsStore {
        FsStore::new(StoreConfig::default()).unwrap()
    }

    #[test]
    fn create_then_lookup_roundtrip() {
        let fs = store();
        let root = fs.root();

        let ino = fs.create(root, "x", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.lookup(root, "x").unwrap(), Some(ino));

        fs.unlink(root, "x").unwrap();
        assert_eq!(fs.lookup(root, "x").unwrap(), None);
    }

    #[test]
    fn lookup_missing_is_none_not_error() {
        let fs = store();
        assert_eq!(fs.lookup(fs.root(), "ghost").unwrap(), None);
    }

    #[test]
    fn lookup_under_file_fails() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.lookup(f, "x"), Err(FsError::NotADirectory));
    }

    #[test]
    fn create_rejects_bad_names() {
        let fs = store();
        let root = fs.root();
        for name in ["", ".", "..", "a/b", "nul\0byte"] {
            assert_eq!(
                fs.create(root, name, NodeType::File, 0o644),
                Err(FsError::InvalidName),
                "name {name:?} should be rejected"
            );
        }
        let long = "x".repeat(256);
        assert_eq!(
            fs.create(root, &long, NodeType::File, 0o644),
            Err(FsError::InvalidName)
        );
    }

    #[test]
    fn sibling_names_stay_unique() {
        let fs = store();
        let root = fs.root();
        fs.create(root, "x", NodeType::File, 0o644).unwrap();
        assert_eq!(
            fs.create(root, "x", NodeType::Directory, 0o755),
            Err(FsError::AlreadyExists)
        );
        assert_eq!(fs.readdir(root, 0).unwrap().len(), 1);
    }

    #[test]
    fn create_under_file_fails() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();
        assert_eq!(
            fs.create(f, "child", NodeType::File, 0o644),
            Err(FsError::NotADirectory)
        );
    }

    #[test]
    fn unlink_missing_is_notfound_and_mutates_nothing() {
        let fs = store();
        let root = fs.root();
        fs.create(root, "keep", NodeType::File, 0o644).unwrap();

        assert_eq!(fs.unlink(root, "ghost"), Err(FsError::NotFound));
        assert_eq!(fs.unlink(root, "ghost"), Err(FsError::NotFound));

        let names: Vec<_> =
            fs.readdir(root, 0).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["keep"]);
    }

    #[test]
    fn unlink_refuses_directories() {
        let fs = store();
        fs.create(fs.root(), "d", NodeType::Directory, 0o755).unwrap();
        assert_eq!(fs.unlink(fs.root(), "d"), Err(FsError::IsADirectory));
    }

    #[test]
    fn rmdir_refuses_files_and_nonempty_dirs() {
        let fs = store();
        let root = fs.root();
        fs.create(root, "f", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.rmdir(root, "f"), Err(FsError::NotADirectory));

        let d = fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        fs.create(d, "inner", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.rmdir(root, "d"), Err(FsError::NotEmpty));

        fs.unlink(d, "inner").unwrap();
        fs.rmdir(root, "d").unwrap();
        assert_eq!(fs.lookup(root, "d").unwrap(), None);
    }

    #[test]
    fn rmdir_missing_is_notfound() {
        let fs = store();
        assert_eq!(fs.rmdir(fs.root(), "ghost"), Err(FsError::NotFound));
    }

    #[test]
    fn link_shares_one_node_until_last_name_goes() {
        let fs = store();
        let root = fs.root();
        let a = fs.create(root, "a", NodeType::File, 0o644).unwrap();
        fs.write(a, 0, b"payload", false).unwrap();

        let b = fs.link(root, "a", root, "b").unwrap();
        assert_eq!(a, b);
        assert_eq!(fs.getattr(a).unwrap().nlink, 2);

        fs.unlink(root, "a").unwrap();
        let attrs = fs.getattr(b).unwrap();
        assert_eq!(attrs.nlink, 1);
        assert_eq!(attrs.len, 7);
        let mut buf = [0u8; 7];
        assert_eq!(fs.read(b, 0, &mut buf).unwrap(), 7);
        assert_eq!(&buf, b"payload");

        fs.unlink(root, "b").unwrap();
        assert_eq!(fs.getattr(b), Err(FsError::NotFound));
    }

    #[test]
    fn link_refuses_directories_and_taken_names() {
        let fs = store();
        let root = fs.root();
        fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        assert_eq!(
            fs.link(root, "d", root, "d2"),
            Err(FsError::IsADirectory)
        );

        fs.create(root, "a", NodeType::File, 0o644).unwrap();
        fs.create(root, "b", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.link(root, "a", root, "b"), Err(FsError::AlreadyExists));
        assert_eq!(fs.link(root, "ghost", root, "c"), Err(FsError::NotFound));
    }

    #[test]
    fn link_across_directories() {
        let fs = store();
        let root = fs.root();
        let d = fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        let a = fs.create(root, "a", NodeType::File, 0o644).unwrap();
        fs.write(a, 0, b"hi", false).unwrap();

        let linked = fs.link(root, "a", d, "alias").unwrap();
        assert_eq!(linked, a);
        assert_eq!(fs.lookup(d, "alias").unwrap(), Some(a));

        // The subtree still refuses rmdir while the alias exists.
        assert_eq!(fs.rmdir(root, "d"), Err(FsError::NotEmpty));
    }

    #[test]
    fn inode_numbers_are_monotonic_and_never_reused() {
        let fs = store();
        let root = fs.root();
        assert_eq!(root.ino(), ROOT_INO);

        let a = fs.create(root, "a", NodeType::File, 0o644).unwrap();
        let b = fs.create(root, "b", NodeType::File, 0o644).unwrap();
        assert_eq!(a.ino(), ROOT_INO + 1);
        assert!(b.ino() > a.ino());

        fs.unlink(root, "a").unwrap();
        let c = fs.create(root, "a", NodeType::File, 0o644).unwrap();
        assert!(c.ino() > b.ino());
    }

    #[test]
    fn readdir_lists_creation_order_from_pos() {
        let fs = store();
        let root = fs.root();
        fs.create(root, "c", NodeType::File, 0o644).unwrap();
        fs.create(root, "a", NodeType::Directory, 0o755).unwrap();
        fs.create(root, "b", NodeType::File, 0o644).unwrap();

        let names: Vec<_> =
            fs.readdir(root, 0).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["c", "a", "b"]);

        let tail: Vec<_> =
            fs.readdir(root, 1).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(tail, ["a", "b"]);

        assert!(fs.readdir(root, 3).unwrap().is_empty());
        assert!(fs.readdir(root, 100).unwrap().is_empty());
    }

    #[test]
    fn readdir_reports_kind_and_ino() {
        let fs = store();
        let root = fs.root();
        let d = fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        let f = fs.create(root, "f", NodeType::File, 0o644).unwrap();

        let entries = fs.readdir(root, 0).unwrap();
        assert_eq!(entries[0].ino, d.ino());
        assert_eq!(entries[0].kind, NodeType::Directory);
        assert_eq!(entries[1].ino, f.ino());
        assert_eq!(entries[1].kind, NodeType::File);
    }

    #[test]
    fn readdir_on_file_fails() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();
        assert_eq!(fs.readdir(f, 0), Err(FsError::NotADirectory));
    }

    #[test]
    fn read_clamps_instead_of_erroring() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();
        fs.write(f, 0, b"hello", false).unwrap();

        let mut buf = [0u8; 10];
        assert_eq!(fs.read(f, 5, &mut buf).unwrap(), 0);
        assert_eq!(fs.read(f, 100, &mut buf).unwrap(), 0);

        let n = fs.read(f, 3, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"lo");
    }

    #[test]
    fn read_write_on_directory_fail() {
        let fs = store();
        let d = fs.create(fs.root(), "d", NodeType::Directory, 0o755).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read(d, 0, &mut buf), Err(FsError::IsADirectory));
        assert_eq!(fs.write(d, 0, b"x", false), Err(FsError::IsADirectory));
    }

    #[test]
    fn write_at_zero_replaces_content() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();

        fs.write(f, 0, b"AA", false).unwrap();
        fs.write(f, 0, b"B", false).unwrap();

        let attrs = fs.getattr(f).unwrap();
        assert_eq!(attrs.len, 1);
        let mut buf = [0u8; 4];
        let n = fs.read(f, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"B");
    }

    #[test]
    fn append_ignores_caller_offset() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();

        fs.write(f, 0, b"ab", true).unwrap();
        fs.write(f, 0, b"cd", true).unwrap();

        let mut buf = [0u8; 8];
        let n = fs.read(f, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"abcd");
    }

    #[test]
    fn write_mid_file_preserves_prefix_and_zero_fills_gaps() {
        let fs = store();
        let f = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();

        fs.write(f, 0, b"abcd", false).unwrap();
        fs.write(f, 2, b"XY", false).unwrap();

        let mut buf = [0u8; 8];
        let n = fs.read(f, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"abXY");

        fs.write(f, 6, b"Z", false).unwrap();
        let attrs = fs.getattr(f).unwrap();
        assert_eq!(attrs.len, 7);
        let mut buf = [0u8; 8];
        let n = fs.read(f, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"abXY\0\0Z");
    }

    #[test]
    fn getattr_reports_metadata() {
        let fs = store();
        let root = fs.root();
        let attrs = fs.getattr(root).unwrap();
        assert_eq!(attrs.kind, NodeType::Directory);
        assert_eq!(attrs.mode, 0o777);
        assert_eq!(attrs.nlink, 1);

        let f = fs.create(root, "f", NodeType::File, 0o600).unwrap();
        fs.write(f, 0, b"123", false).unwrap();
        let attrs = fs.getattr(f).unwrap();
        assert_eq!(attrs.ino, f.ino());
        assert_eq!(attrs.kind, NodeType::File);
        assert_eq!(attrs.mode, 0o600);
        assert_eq!(attrs.len, 3);
    }

    #[test]
    fn path_reconstruction_for_diagnostics() {
        let fs = store();
        let root = fs.root();
        let a = fs.create(root, "a", NodeType::Directory, 0o755).unwrap();
        let b = fs.create(a, "b", NodeType::Directory, 0o755).unwrap();
        let c = fs.create(b, "c", NodeType::File, 0o644).unwrap();

        assert_eq!(fs.path_of(root).unwrap(), "/");
        assert_eq!(fs.path_of(c).unwrap(), "/a/b/c");

        fs.unlink(b, "c").unwrap();
        assert_eq!(fs.path_of(c), Err(FsError::NotFound));
    }

    #[test]
    fn stats_track_nodes_and_bytes() {
        let fs = store();
        let root = fs.root();
        assert_eq!(
            fs.stats(),
            StoreStats {
                nodes: 1,
                bytes_in_memory: 0
            }
        );

        let f = fs.create(root, "f", NodeType::File, 0o644).unwrap();
        fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        fs.write(f, 0, b"12345", false).unwrap();
        assert_eq!(
            fs.stats(),
            StoreStats {
                nodes: 3,
                bytes_in_memory: 5
            }
        );

        fs.unlink(root, "f").unwrap();
        assert_eq!(
            fs.stats(),
            StoreStats {
                nodes: 2,
                bytes_in_memory: 0
            }
        );
    }

    #[test]
    fn teardown_releases_the_whole_tree() {
        let mut fs = store();
        let root = fs.root();
        let d = fs.create(root, "d", NodeType::Directory, 0o755).unwrap();
        let f = fs.create(d, "f", NodeType::File, 0o644).unwrap();
        fs.write(f, 0, b"bytes", false).unwrap();

        fs.teardown();
        assert_eq!(
            fs.stats(),
            StoreStats {
                nodes: 0,
                bytes_in_memory: 0
            }
        );
        assert_eq!(fs.lookup(root, "d"), Err(FsError::NotFound));
        assert_eq!(fs.getattr(f), Err(FsError::NotFound));
    }

    #[test]
    fn errno_mapping_matches_os_codes() {
        assert_eq!(FsError::NotFound.errno(), libc::ENOENT);
        assert_eq!(FsError::NotEmpty.errno(), libc::ENOTEMPTY);
        assert_eq!(FsError::OutOfMemory.errno(), libc::ENOMEM);
    }

    #[test]
    fn name_length_limit_comes_from_config() {
        let config = StoreConfig {
            limits: crate::config::StoreLimits { max_name_len: 4 },
            ..StoreConfig::default()
        };
        let fs = FsStore::new(config).unwrap();
        fs.create(fs.root(), "abcd", NodeType::File, 0o644).unwrap();
        assert_eq!(
            fs.create(fs.root(), "abcde", NodeType::File, 0o644),
            Err(FsError::InvalidName)
        );
    }
}
