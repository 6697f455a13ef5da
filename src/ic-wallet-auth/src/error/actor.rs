use candid::Principal;
use ic_agent::AgentError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("Failed to parse candid interface")]
    ParseCandidFailed(#[source] candid_parser::Error),

    #[error("The candid interface does not declare a service")]
    NoService,

    #[error("The candid service type is malformed")]
    MalformedService(#[source] candid::Error),
}

#[derive(Error, Debug)]
pub enum BuildAgentError {
    #[error("failed to create agent")]
    CreateAgent(#[source] AgentError),
}

#[derive(Error, Debug)]
pub enum CreateActorError {
    #[error(transparent)]
    BuildAgent(#[from] BuildAgentError),
}

#[derive(Error, Debug)]
pub enum CallActorError {
    #[error("Canister {canister_id} has no method '{method}'")]
    UnknownMethod {
        canister_id: Principal,
        method: String,
    },

    #[error("Call to '{method}' on canister {canister_id} failed")]
    CallFailed {
        canister_id: Principal,
        method: String,
        source: AgentError,
    },
}
