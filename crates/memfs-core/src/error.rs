// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the namespace store

use std::collections::TryReserveError;

/// Store error type
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
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
    NotEmpty,
    #[error("name not allowed")]
    InvalidName,
    #[error("out of memory")]
    OutOfMemory,
}

impl FsError {
    /// OS error number for adapters that surface errno-style failures.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::InvalidName => libc::EINVAL,
            FsError::OutOfMemory => libc::ENOMEM,
        }
    }
}

impl From<TryReserveError> for FsError {
    fn from(_: TryReserveError) -> Self {
        FsError::OutOfMemory
    }
}

pub type FsResult<T> = Result<T, FsError>;
