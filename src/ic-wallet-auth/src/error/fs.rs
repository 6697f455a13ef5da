use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Cannot create directory {0}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    #[error("{0} has no parent directory")]
    NoParentDir(PathBuf),

    #[error("Cannot read {0}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Cannot replace {1} with {0}")]
    Replace(PathBuf, PathBuf, #[source] std::io::Error),

    #[error("Cannot write {0}")]
    Write(PathBuf, #[source] std::io::Error),
}

impl FsError {
    /// The file or directory the failed operation targeted.
    pub fn path(&self) -> &Path {
        match self {
            FsError::CreateDir(path, _)
            | FsError::NoParentDir(path)
            | FsError::Read(path, _)
            | FsError::Write(path, _) => path,
            FsError::Replace(_, target, _) => target,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::Read(_, err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}
