use crate::error::json::JsonFileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load key/value storage")]
    LoadFailed(#[source] JsonFileError),

    #[error("Failed to save key/value storage")]
    SaveFailed(#[source] JsonFileError),
}
