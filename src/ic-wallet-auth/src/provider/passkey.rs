//! Adapter for a passkey-custodial wallet that reports several accounts.
use crate::account::parse_provider_accounts;
use crate::actor::{create_authenticated_actor, ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::config::NetworkConfig;
use crate::error::provider::{LoginError, ProviderError};
use crate::provider::{
    AdapterSnapshot, LoginContext, ProviderAdapter, Session, SessionIdentity, SessionMachine,
};
use crate::source::{Source, SourceStore};
use async_trait::async_trait;
use candid::Principal;
use ic_agent::Identity;
use slog::{error, warn, Logger};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

#[async_trait]
pub trait PasskeyClient: Send + Sync {
    /// The identity persisted by an earlier connect, if any.
    async fn load(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError>;

    async fn connect(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError>;

    /// JSON list of `{name, address}` objects.
    async fn accounts(&self) -> Result<String, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait PasskeyClientFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn PasskeyClient>, ProviderError>;
}

pub struct PasskeyWalletAdapter {
    factory: Arc<dyn PasskeyClientFactory>,
    client: OnceCell<Arc<dyn PasskeyClient>>,
    network: NetworkConfig,
    machine: SessionMachine,
}

impl PasskeyWalletAdapter {
    pub fn new(
        factory: Arc<dyn PasskeyClientFactory>,
        store: SourceStore,
        network: NetworkConfig,
        logger: &Logger,
    ) -> Self {
        Self {
            factory,
            client: OnceCell::new(),
            network,
            machine: SessionMachine::new(Source::PasskeyWallet, store, logger),
        }
    }

    async fn provide_client(&self) -> Result<Arc<dyn PasskeyClient>, ProviderError> {
        self.client
            .get_or_try_init(|| self.factory.create())
            .await
            .cloned()
    }

    async fn session_for(
        &self,
        client: &dyn PasskeyClient,
        identity: Option<Arc<dyn Identity>>,
    ) -> Result<Option<Session>, ProviderError> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        let principal = identity
            .sender()
            .map_err(ProviderError::InvalidResponse)?;
        let payload = match client.accounts().await {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(self.machine.logger(), "cannot read accounts: {}", err);
                None
            }
        };
        Ok(Some(Session {
            identity: Some(SessionIdentity::new(identity)),
            principal,
            accounts: parse_provider_accounts(payload.as_deref()),
        }))
    }

    async fn restore_session(&self) -> Result<Option<Session>, ProviderError> {
        let client = self.provide_client().await?;
        let identity = client.load().await?;
        self.session_for(client.as_ref(), identity).await
    }

    async fn login_session(&self) -> Result<Option<Session>, ProviderError> {
        let client = self.provide_client().await?;
        let identity = client.connect().await?;
        self.session_for(client.as_ref(), identity).await
    }
}

#[async_trait]
impl ProviderAdapter for PasskeyWalletAdapter {
    fn source(&self) -> Source {
        Source::PasskeyWallet
    }

    fn snapshot(&self) -> AdapterSnapshot {
        self.machine.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<AdapterSnapshot> {
        self.machine.subscribe()
    }

    async fn restore(&self, _context: &LoginContext) {
        self.machine.restore_with(|| self.restore_session()).await
    }

    async fn login(&self, _context: &LoginContext) -> Result<bool, LoginError> {
        Ok(self
            .machine
            .login_with(|| self.login_session())
            .await
            .unwrap_or(false))
    }

    async fn logout(&self) {
        self.machine
            .logout_with(|| async move { self.provide_client().await?.disconnect().await })
            .await
    }

    async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
        options: &CreateActorOptions,
    ) -> Option<ActorHandle> {
        if !self.machine.is_logged_in() {
            return None;
        }
        let identity = self.machine.identity()?;
        create_authenticated_actor(
            identity.identity(),
            canister_id,
            interface,
            options,
            &self.network,
            self.machine.logger(),
        )
        .await
        .map_err(|err| error!(self.machine.logger(), "createActor: caught error: {}", err))
        .ok()
    }
}
