//! Error taxonomy shared by every component in the crate.

use std::path::PathBuf;

/// Result alias used by all public operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single failure from a filesystem operation, carrying the offending
/// path when one is reachable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Destination of a createNew/move/mount already exists.
    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Non-recursive delete attempted on a non-empty directory.
    #[error("directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// Path escapes root, contains a forbidden segment at the leaf, or is
    /// syntactically invalid.
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Operation not permitted by the component's capability flags.
    #[error("not supported: {}", .0.display())]
    NotSupported(PathBuf),

    /// A stream attempted an I/O call its access bits do not grant.
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    /// A share-flag conflict rejected an open.
    #[error("file locked: {}", .0.display())]
    FileLocked(PathBuf),

    /// BlockPool rejected an allocation.
    #[error("out of space")]
    OutOfSpace,

    /// Operation attempted on an object that has already been disposed.
    #[error("disposed")]
    Disposed,

    /// Multiple errors accumulated during cascaded disposal.
    #[error("{} error(s) occurred during disposal", .0.len())]
    Aggregate(Vec<Error>),

    /// A configuration document failed to parse or violated its schema.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns the offending path, when this variant carries one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Error::NotFound(p)
            | Error::AlreadyExists(p)
            | Error::DirectoryNotEmpty(p)
            | Error::InvalidPath(p)
            | Error::NotSupported(p)
            | Error::AccessDenied(p)
            | Error::FileLocked(p) => Some(p),
            Error::OutOfSpace | Error::Disposed | Error::Aggregate(_) | Error::InvalidConfig(_) => None,
        }
    }
}
