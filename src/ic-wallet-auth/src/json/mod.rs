use crate::error::json::JsonFileError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, JsonFileError> {
    let content = crate::fs::read(path)?;
    serde_json::from_slice(&content).map_err(|err| JsonFileError::Parse(path.to_path_buf(), err))
}

/// Like [`read_json_file`], with a missing file reported as `None`.
pub fn read_json_file_if_exists<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, JsonFileError> {
    match read_json_file(path) {
        Ok(value) => Ok(Some(value)),
        Err(JsonFileError::Fs(err)) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), JsonFileError> {
    let content = serde_json::to_vec_pretty(value)
        .map_err(|err| JsonFileError::Encode(path.to_path_buf(), err))?;
    crate::fs::replace_file(path, &content)?;
    Ok(())
}
