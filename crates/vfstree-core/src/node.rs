// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Node and tree data model
//!
//! Nodes live in an id-indexed arena owned by `FsCore`. Ownership flows
//! strictly parent to child through the `children` map; the `parent` field
//! is a weak index used only for path reconstruction and quota-scope
//! lookup, never for traversal ownership.

use indexmap::IndexMap;

use crate::types::{ContentId, FileTimes, FileType};

/// Internal node ID for filesystem nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) u64);

/// Filesystem node types
#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    File {
        content: ContentId,
    },
    /// Children preserve insertion order for listing. Dot entries are never
    /// stored; they are synthesized at the readdir boundary.
    Directory {
        children: IndexMap<String, NodeId>,
    },
    /// Target is a path string resolved lazily at access time; dangling
    /// targets are valid until traversed.
    Symlink {
        target: String,
    },
    /// Behaves like a file for content purposes, tagged as a device for
    /// traversal and display.
    BlockDevice {
        content: ContentId,
    },
}

/// Filesystem node
#[derive(Clone, Debug)]
pub(crate) struct Node {
    #[allow(dead_code)] // ID currently unused outside of debugging; kept for future referencing
    pub(crate) id: NodeId,
    pub kind: NodeKind,
    pub times: FileTimes,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::File { .. } => FileType::File,
            NodeKind::Directory { .. } => FileType::Directory,
            NodeKind::Symlink { .. } => FileType::Symlink,
            NodeKind::BlockDevice { .. } => FileType::BlockDevice,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Content id for file-like nodes (files and block devices)
    pub fn content_id(&self) -> Option<ContentId> {
        match self.kind {
            NodeKind::File { content } | NodeKind::BlockDevice { content } => Some(content),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&IndexMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut IndexMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(id: u64) -> Node {
        Node {
            id: NodeId(id),
            kind: NodeKind::Directory {
                children: IndexMap::new(),
            },
            times: FileTimes {
                atime: 0,
                mtime: 0,
                ctime: 0,
            },
            mode: 0o755,
            uid: 0,
            gid: 0,
            parent: None,
        }
    }

    #[test]
    fn children_preserve_insertion_order() {
        let mut dir = directory(1);
        let children = dir.children_mut().unwrap();
        children.insert("zeta".to_string(), NodeId(2));
        children.insert("alpha".to_string(), NodeId(3));
        children.insert("mid".to_string(), NodeId(4));

        let names: Vec<&str> = dir.children().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn removal_keeps_remaining_order() {
        let mut dir = directory(1);
        let children = dir.children_mut().unwrap();
        children.insert("a".to_string(), NodeId(2));
        children.insert("b".to_string(), NodeId(3));
        children.insert("c".to_string(), NodeId(4));
        children.shift_remove("b");

        let names: Vec<&str> = dir.children().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn file_type_tags_follow_kind() {
        let dir = directory(1);
        assert_eq!(dir.file_type(), FileType::Directory);
        assert!(dir.is_directory());
        assert_eq!(dir.content_id(), None);

        let dev = Node {
            kind: NodeKind::BlockDevice {
                content: ContentId::new(9),
            },
            ..directory(2)
        };
        assert_eq!(dev.file_type(), FileType::BlockDevice);
        assert_eq!(dev.content_id(), Some(ContentId::new(9)));
    }
}
