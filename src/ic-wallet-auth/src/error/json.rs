use crate::error::fs::FsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonFileError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("{0} does not contain valid JSON for this value")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Cannot encode the value to be stored in {0}")]
    Encode(PathBuf, #[source] serde_json::Error),
}
