use crate::actor::{ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::config::NetworkConfig;
use crate::error::actor::{BuildAgentError, CreateActorError};
use candid::Principal;
use ic_agent::{Agent, Identity};
use slog::{debug, error, warn, Logger};
use std::sync::Arc;

/// Builds an agent against the configured host (or the per-call override),
/// signing as `identity`, or anonymously when `None`.
pub fn build_agent(
    identity: Option<Arc<dyn Identity>>,
    network: &NetworkConfig,
    options: &CreateActorOptions,
) -> Result<Agent, BuildAgentError> {
    let host = options.host.as_ref().unwrap_or(&network.host);
    let mut builder = Agent::builder().with_url(host.as_str());
    if let Some(identity) = identity {
        builder = builder.with_arc_identity(identity);
    }
    if let Some(ingress_expiry) = options.ingress_expiry {
        builder = builder.with_ingress_expiry(ingress_expiry);
    }
    builder.build().map_err(BuildAgentError::CreateAgent)
}

/// The unauthenticated path, used whenever nobody is logged in.
pub async fn create_actor_generic(
    canister_id: Principal,
    interface: Arc<InterfaceDescriptor>,
    options: &CreateActorOptions,
    network: &NetworkConfig,
    logger: &Logger,
) -> Result<ActorHandle, CreateActorError> {
    let agent = build_agent(None, network, options)?;
    fetch_root_key_unless_production(&agent, network, logger).await;
    Ok(ActorHandle::new(agent, canister_id, interface))
}

pub async fn create_authenticated_actor(
    identity: Arc<dyn Identity>,
    canister_id: Principal,
    interface: Arc<InterfaceDescriptor>,
    options: &CreateActorOptions,
    network: &NetworkConfig,
    logger: &Logger,
) -> Result<ActorHandle, CreateActorError> {
    let agent = build_agent(Some(identity), network, options)?;
    fetch_root_key_unless_production(&agent, network, logger).await;
    Ok(ActorHandle::new(agent, canister_id, interface))
}

/// Certificate validation against a local replica needs its root key.
/// Failing to fetch it is only logged; calls made with the agent will
/// report their own errors.
async fn fetch_root_key_unless_production(agent: &Agent, network: &NetworkConfig, logger: &Logger) {
    if network.production {
        return;
    }
    debug!(logger, "Fetching root key from {}", network.host);
    if let Err(err) = agent.fetch_root_key().await {
        warn!(
            logger,
            "Unable to fetch root key. Check to ensure that your local replica is running"
        );
        error!(logger, "{}", err);
    }
}
