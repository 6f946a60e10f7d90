//! Error types shared by every file-store implementation.

use std::fmt;

use thiserror::Error;

/// Kind of remote object an operation was addressed at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Top-level share.
    Share,
    /// Directory inside a share.
    Directory,
    /// File inside a share or directory.
    File,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Share => "share",
            Self::Directory => "directory",
            Self::File => "file",
        };
        f.write_str(label)
    }
}

/// Errors raised by file-store operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    /// Raised when the addressed object does not exist.
    #[error("{kind} '{path}' not found")]
    NotFound {
        /// Kind of object that was missing.
        kind: ResourceKind,
        /// Full path of the missing object.
        path: String,
    },
    /// Raised when creation collides with an existing object.
    #[error("{kind} '{path}' already exists")]
    AlreadyExists {
        /// Kind of object that already exists.
        kind: ResourceKind,
        /// Full path of the existing object.
        path: String,
    },
    /// Raised when a share or component name breaks the naming rules.
    #[error("invalid name '{name}': {rule}")]
    InvalidName {
        /// Name supplied by the caller.
        name: String,
        /// Rule that the name violated.
        rule: &'static str,
    },
    /// Raised when a request is malformed or misses a required field.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when a range write falls outside the file's allocated length.
    #[error("range {start}-{end} does not fit file '{path}' of length {length}")]
    RangeOutOfBounds {
        /// Full path of the file.
        path: String,
        /// First byte of the rejected range.
        start: u64,
        /// Last byte of the rejected range.
        end: u64,
        /// Allocated length of the file.
        length: u64,
    },
    /// Raised when a write would push a share past its quota.
    #[error("share '{share}' quota of {quota_gb} GiB cannot fit {requested} more bytes")]
    QuotaExceeded {
        /// Share whose quota was hit.
        share: String,
        /// Configured quota in GiB.
        quota_gb: u32,
        /// Additional bytes the rejected request asked for.
        requested: u64,
    },
    /// Raised when an abort names a copy that is not pending.
    #[error("no pending copy with id '{copy_id}' on file '{path}'")]
    NoPendingCopy {
        /// Full path of the destination file.
        path: String,
        /// Copy identifier passed by the caller.
        copy_id: String,
    },
    /// Raised when a copy source URL cannot be resolved by this account.
    #[error("copy source '{url}' is not reachable from this account")]
    BadCopySource {
        /// Source URL passed by the caller.
        url: String,
    },
    /// Raised when an asynchronous operation exceeds its deadline.
    #[error("timeout waiting for {action} on '{path}'")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Full path of the object being waited on.
        path: String,
    },
    /// Wrapper for service level failures.
    #[error("service error: {message}")]
    Service {
        /// Message returned by the service.
        message: String,
    },
}

impl StoreError {
    /// True when the error reports a missing object rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Shorthand for a [`StoreError::NotFound`] with an owned path.
    #[must_use]
    pub fn not_found(kind: ResourceKind, path: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            path: path.into(),
        }
    }

    /// Shorthand for a [`StoreError::AlreadyExists`] with an owned path.
    #[must_use]
    pub fn already_exists(kind: ResourceKind, path: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            path: path.into(),
        }
    }
}
