//! File helpers that attach the offending path to every io error.
use crate::error::fs::FsError;
use std::fs::File;
use std::path::Path;

pub fn read(path: &Path) -> Result<Vec<u8>, FsError> {
    std::fs::read(path).map_err(|err| FsError::Read(path.to_path_buf(), err))
}

pub fn create_file(path: &Path) -> Result<File, FsError> {
    File::create(path).map_err(|err| FsError::Write(path.to_path_buf(), err))
}

/// Writes `contents` next to `path`, then renames it over `path`, so readers
/// see either the old or the new contents. Missing parent directories are
/// created.
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<(), FsError> {
    let parent = path
        .parent()
        .ok_or_else(|| FsError::NoParentDir(path.to_path_buf()))?;
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)
            .map_err(|err| FsError::CreateDir(parent.to_path_buf(), err))?;
    }
    let staged = path.with_extension("tmp");
    std::fs::write(&staged, contents).map_err(|err| FsError::Write(staged.clone(), err))?;
    std::fs::rename(&staged, path)
        .map_err(|err| FsError::Replace(staged, path.to_path_buf(), err))
}
