//! Typed clients bound to a backend canister and an authentication context.
use crate::error::actor::{CallActorError, InterfaceError};
use candid::Principal;
use candid_parser::utils::CandidSource;
use ic_agent::Agent;
use ic_utils::canister::CanisterBuilderError;
use ic_utils::Canister;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

mod generic;

pub use generic::{build_agent, create_actor_generic, create_authenticated_actor};

/// Overrides applied when an actor's agent is constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateActorOptions {
    pub host: Option<Url>,
    pub ingress_expiry: Option<Duration>,
}

/// A candid service description, validated once and kept as text.
#[derive(Clone, Debug)]
pub struct InterfaceDescriptor {
    did: Arc<str>,
    methods: Vec<String>,
}

impl InterfaceDescriptor {
    pub fn from_candid(did: &str) -> Result<Self, InterfaceError> {
        let (env, service) = CandidSource::Text(did)
            .load()
            .map_err(InterfaceError::ParseCandidFailed)?;
        let service = service.ok_or(InterfaceError::NoService)?;
        let methods = env
            .as_service(&service)
            .map_err(InterfaceError::MalformedService)?
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        Ok(Self {
            did: Arc::from(did),
            methods,
        })
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// The candid source this descriptor was parsed from.
    pub fn candid(&self) -> &str {
        &self.did
    }
}

#[derive(Clone)]
pub struct ActorHandle {
    agent: Agent,
    canister_id: Principal,
    interface: Arc<InterfaceDescriptor>,
}

impl Debug for ActorHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorHandle")
            .field("canister_id", &self.canister_id.to_text())
            .field("methods", &self.interface.methods())
            .finish()
    }
}

impl ActorHandle {
    pub fn new(agent: Agent, canister_id: Principal, interface: Arc<InterfaceDescriptor>) -> Self {
        Self {
            agent,
            canister_id,
            interface,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn canister_id(&self) -> Principal {
        self.canister_id
    }

    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    /// An `ic_utils` canister for typed calls.
    pub fn canister(&self) -> Result<Canister<'_>, CanisterBuilderError> {
        Canister::builder()
            .with_agent(&self.agent)
            .with_canister_id(self.canister_id)
            .build()
    }

    pub async fn query(&self, method: &str, arg: Vec<u8>) -> Result<Vec<u8>, CallActorError> {
        self.require_method(method)?;
        self.agent
            .query(&self.canister_id, method)
            .with_arg(arg)
            .call()
            .await
            .map_err(|source| CallActorError::CallFailed {
                canister_id: self.canister_id,
                method: method.to_string(),
                source,
            })
    }

    pub async fn update(&self, method: &str, arg: Vec<u8>) -> Result<Vec<u8>, CallActorError> {
        self.require_method(method)?;
        self.agent
            .update(&self.canister_id, method)
            .with_arg(arg)
            .call_and_wait()
            .await
            .map_err(|source| CallActorError::CallFailed {
                canister_id: self.canister_id,
                method: method.to_string(),
                source,
            })
    }

    fn require_method(&self, method: &str) -> Result<(), CallActorError> {
        if self.interface.has_method(method) {
            Ok(())
        } else {
            Err(CallActorError::UnknownMethod {
                canister_id: self.canister_id,
                method: method.to_string(),
            })
        }
    }
}
