// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! vfstree-core: an in-process virtual filesystem
//!
//! A tree of files, directories, symlinks, and block devices held entirely
//! in memory, with POSIX-like semantics: permission bits and ownership,
//! quota ceilings over subtrees, seek/truncate, ordered directory listings,
//! and symlink resolution with a bounded hop count. Nothing touches real
//! storage and nothing survives the process, which makes the engine a good
//! substrate for exercising filesystem-dependent logic in tests.
//!
//! Every operation is synchronous and runs to completion. Instances are
//! independent; create one per test for isolation.
//!
//! ```
//! use std::path::Path;
//! use vfstree_core::{Credentials, FsConfig, FsCore, OpenOptions};
//!
//! let fs = FsCore::new(FsConfig::default());
//! let creds = Credentials::root();
//! fs.mkdir(&creds, Path::new("/etc"), 0o755).unwrap();
//! fs.create_file(&creds, Path::new("/etc/motd"), b"welcome").unwrap();
//!
//! let handle = fs
//!     .open(&creds, Path::new("/etc/motd"), &OpenOptions::read_only())
//!     .unwrap();
//! let mut buf = [0u8; 7];
//! fs.read(&creds, handle, &mut buf).unwrap();
//! assert_eq!(&buf, b"welcome");
//! ```

pub mod config;
pub mod content;
pub mod error;
mod node;
pub mod quota;
#[cfg(test)]
mod test_scenarios;
pub mod types;
pub mod vfs;
pub mod visit;

pub use config::{FsConfig, QuotaPolicy, ResolutionLimits, SecurityPolicy, MAX_SYMLINK_HOPS};
pub use content::{BufferContent, Content, SparseContent};
pub use error::{FsError, FsResult};
pub use quota::Quota;
pub use types::{
    Attributes, ContentId, Credentials, DirEntry, FileMode, FileTimes, FileType, FsStats,
    HandleId, OpenOptions,
};
#[cfg(feature = "events")]
pub use types::{EventKind, EventSink, SubscriptionId};
pub use vfs::FsCore;
pub use visit::{NodeVisitor, PrintVisitor, StructureVisitor, VisitNode};

// The cursor positioning type accepted by `FsCore::seek`.
pub use std::io::SeekFrom;
