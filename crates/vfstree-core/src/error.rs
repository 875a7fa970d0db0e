// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the vfstree engine

use std::io;

/// Core filesystem error type
///
/// Every variant except `Io` is an ordinary, recoverable outcome the caller
/// may handle by retrying with different arguments. Structural invariant
/// violations (double-attach, quota underflow) panic instead of surfacing
/// here.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("permission denied")]
    PermissionDenied,
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("too many levels of symbolic links")]
    TooManySymlinks,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type FsResult<T> = Result<T, FsError>;
