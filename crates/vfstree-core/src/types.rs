// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for vfstree

/// Security identity an operation runs as (uid, gid, and supplementary
/// groups). No identity resolution is performed by the engine; callers pass
/// whatever integers their environment defines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
}

impl Credentials {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            groups: Vec::new(),
        }
    }

    /// The conventional superuser identity
    pub fn root() -> Self {
        Self::new(0, 0)
    }

    pub fn with_groups(mut self, groups: Vec<u32>) -> Self {
        self.groups = groups;
        self
    }

    pub(crate) fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}

/// Opaque handle identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Content identifier into the content table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentId(pub u64);

impl ContentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// File timestamps, seconds since the epoch
#[derive(Clone, Copy, Debug)]
pub struct FileTimes {
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

/// One permission-bit class of a node's mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileMode {
    pub read: bool,
    pub write: bool,
    pub exec: bool,
}

impl FileMode {
    pub(crate) fn from_bits(mode: u32, shift: u32) -> Self {
        Self {
            read: mode & (0o4 << shift) != 0,
            write: mode & (0o2 << shift) != 0,
            exec: mode & (0o1 << shift) != 0,
        }
    }
}

/// Kind tag of a tree entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
    BlockDevice,
}

/// Node attributes as reported by `getattr`
#[derive(Clone, Debug)]
pub struct Attributes {
    pub kind: FileType,
    pub len: u64,
    pub times: FileTimes,
    pub uid: u32,
    pub gid: u32,
    /// Raw mode bits (permission bits plus sticky flag)
    pub mode: u32,
    pub mode_user: FileMode,
    pub mode_group: FileMode,
    pub mode_other: FileMode,
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
    pub len: u64,
}

/// File open options
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenOptions {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    pub fn create_rw() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            ..Self::default()
        }
    }
}

/// Filesystem statistics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsStats {
    pub nodes: u64,
    pub open_handles: u32,
    pub bytes_used: u64,
}

/// Event kinds for filesystem change notifications
#[cfg(feature = "events")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Created { path: String },
    Removed { path: String },
    Modified { path: String },
    Renamed { from: String, to: String },
}

/// Event sink trait for receiving filesystem change notifications
#[cfg(feature = "events")]
pub trait EventSink: Send + Sync {
    fn on_event(&self, evt: &EventKind);
}

/// Opaque event subscription identifier
#[cfg(feature = "events")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[cfg(feature = "events")]
impl SubscriptionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mode_decodes_each_class() {
        let mode = 0o640;
        assert_eq!(
            FileMode::from_bits(mode, 6),
            FileMode {
                read: true,
                write: true,
                exec: false
            }
        );
        assert_eq!(
            FileMode::from_bits(mode, 3),
            FileMode {
                read: true,
                write: false,
                exec: false
            }
        );
        assert_eq!(
            FileMode::from_bits(mode, 0),
            FileMode {
                read: false,
                write: false,
                exec: false
            }
        );
    }

    #[test]
    fn group_membership_includes_supplementary_groups() {
        let creds = Credentials::new(1000, 1000).with_groups(vec![4, 27]);
        assert!(creds.in_group(1000));
        assert!(creds.in_group(27));
        assert!(!creds.in_group(5));
    }
}
