use crate::error::json::JsonFileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadAuthConfigError {
    #[error("Failed to load authentication configuration")]
    LoadConfigFailed(#[source] JsonFileError),

    #[error("Canister id '{0}' in the canister registry is not a valid principal")]
    InvalidCanisterId(String, #[source] candid::types::principal::PrincipalError),
}
