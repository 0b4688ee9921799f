// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for the namespace store

use serde::{Deserialize, Serialize};

/// Stable node handle. The value is the node's inode number, unique and
/// monotonically assigned for the lifetime of one store.
///
/// A handle stays resolvable only while the node it names is still reachable
/// (for files, while at least one name refers to it). Operations against a
/// handle whose node has been released fail with `NotFound`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn ino(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node kind as visible to adapters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Directory,
    File,
}

/// Node timestamps (seconds since the epoch)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileTimes {
    pub mtime: i64,
    pub ctime: i64,
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub ino: u64,
    pub kind: NodeType,
}

/// Node attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub ino: u64,
    pub kind: NodeType,
    /// Permission bits. The store records them verbatim; enforcement is the
    /// adapter's concern.
    pub mode: u32,
    /// Number of names currently referring to the node.
    pub nlink: u32,
    /// Logical content size for files, 0 for directories.
    pub len: u64,
    pub times: FileTimes,
}

/// Store statistics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreStats {
    /// Live nodes in the table, the root included.
    pub nodes: u64,
    /// Bytes of file content currently resident.
    pub bytes_in_memory: u64,
}
