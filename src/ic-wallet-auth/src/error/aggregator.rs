use crate::error::config::LoadAuthConfigError;
use crate::source::Source;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildAggregatorError {
    #[error("An adapter for {0} was registered more than once")]
    DuplicateAdapter(Source),

    #[error("Failed to prepare the canister whitelist")]
    PrepareWhitelistFailed(#[from] LoadAuthConfigError),
}
