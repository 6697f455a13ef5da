//! Adapter for delegated-identity services that authenticate in a popup and
//! hand back a time-limited delegation chain.
use crate::account::{derive_accounts, PrincipalSource};
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
use slog::{error, Logger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use url::Url;

/// Longest delegation the adapter asks for: 30 days.
pub const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Size of the login popup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    /// Window features string for a popup without browser chrome.
    pub fn features(&self) -> String {
        format!(
            "toolbar=0,location=0,menubar=0,width={},height={}",
            self.width, self.height
        )
    }

    /// Same as [`features`](Self::features), centered on a screen of the given size.
    pub fn centered_features(&self, screen_width: u32, screen_height: u32) -> String {
        let left = screen_width.saturating_sub(self.width) / 2;
        let top = screen_height.saturating_sub(self.height) / 2;
        format!("{},left={},top={}", self.features(), left, top)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegatedIdentityConfig {
    pub source: Source,
    /// Name given to the single derived account.
    pub label: String,
    pub window: WindowGeometry,
}

impl DelegatedIdentityConfig {
    pub fn primary() -> Self {
        Self {
            source: Source::DelegatedIdentityA,
            label: "Internet Identity".to_string(),
            window: WindowGeometry {
                width: 400,
                height: 600,
            },
        }
    }

    pub fn secondary() -> Self {
        Self {
            source: Source::DelegatedIdentityB,
            label: "NFID".to_string(),
            window: WindowGeometry {
                width: 525,
                height: 705,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthClientLoginOptions {
    pub identity_provider: Option<Url>,
    pub max_time_to_live: Duration,
    pub window_features: String,
}

/// The delegated-identity SDK client.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, ProviderError>;

    /// The current identity; anonymous until a login succeeds.
    fn identity(&self) -> Arc<dyn Identity>;

    /// Resolves once the popup flow completes.
    async fn login(&self, options: AuthClientLoginOptions) -> Result<(), ProviderError>;

    async fn logout(&self) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait AuthClientFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn AuthClient>, ProviderError>;
}

pub struct DelegatedIdentityAdapter {
    config: DelegatedIdentityConfig,
    factory: Arc<dyn AuthClientFactory>,
    client: OnceCell<Arc<dyn AuthClient>>,
    network: NetworkConfig,
    machine: SessionMachine,
}

impl DelegatedIdentityAdapter {
    pub fn new(
        config: DelegatedIdentityConfig,
        factory: Arc<dyn AuthClientFactory>,
        store: SourceStore,
        network: NetworkConfig,
        logger: &Logger,
    ) -> Self {
        let machine = SessionMachine::new(config.source, store, logger);
        Self {
            config,
            factory,
            client: OnceCell::new(),
            network,
            machine,
        }
    }

    /// The SDK client, created on first use and kept for the adapter's lifetime.
    async fn provide_client(&self) -> Result<Arc<dyn AuthClient>, ProviderError> {
        self.client
            .get_or_try_init(|| async move {
                let client = self.factory.create().await?;
                // loads any persisted delegation
                client.is_authenticated().await?;
                Ok::<_, ProviderError>(client)
            })
            .await
            .cloned()
    }

    fn session_for(&self, identity: Arc<dyn Identity>) -> Option<Session> {
        let principal = identity.sender().ok()?;
        let accounts = derive_accounts(PrincipalSource::Identity(identity.as_ref()), &self.config.label);
        Some(Session {
            identity: Some(SessionIdentity::new(identity)),
            principal,
            accounts,
        })
    }

    async fn restore_session(&self) -> Result<Option<Session>, ProviderError> {
        let client = self.provide_client().await?;
        if client.is_authenticated().await? {
            let identity = client.identity();
            if identity.sender().is_ok_and(|principal| principal != Principal::anonymous()) {
                return Ok(self.session_for(identity));
            }
        }
        client.logout().await?;
        Ok(None)
    }

    async fn login_session(&self, context: &LoginContext) -> Result<Option<Session>, ProviderError> {
        let client = self.provide_client().await?;
        client
            .login(AuthClientLoginOptions {
                identity_provider: context.identity_provider.clone(),
                max_time_to_live: MAX_TIME_TO_LIVE,
                window_features: self.config.window.features(),
            })
            .await?;
        Ok(self.session_for(client.identity()))
    }
}

#[async_trait]
impl ProviderAdapter for DelegatedIdentityAdapter {
    fn source(&self) -> Source {
        self.config.source
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

    async fn login(&self, context: &LoginContext) -> Result<bool, LoginError> {
        Ok(self
            .machine
            .login_with(|| self.login_session(context))
            .await
            .unwrap_or(false))
    }

    async fn logout(&self) {
        self.machine
            .logout_with(|| async move {
                let client = self.provide_client().await?;
                client.logout().await
            })
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
        match create_authenticated_actor(
            identity.identity(),
            canister_id,
            interface,
            options,
            &self.network,
            self.machine.logger(),
        )
        .await
        {
            Ok(actor) => Some(actor),
            Err(err) => {
                error!(self.machine.logger(), "createActor: caught error: {}", err);
                None
            }
        }
    }
}
