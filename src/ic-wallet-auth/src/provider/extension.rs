//! Adapter for a browser-extension wallet that owns its own agent.
use crate::account::{derive_accounts, PrincipalSource};
use crate::actor::{ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::error::provider::{LoginError, ProviderError};
use crate::provider::{
    AdapterSnapshot, LoginContext, ProviderAdapter, Session, SessionIdentity, SessionMachine,
};
use crate::source::{Source, SourceStore};
use async_trait::async_trait;
use candid::Principal;
use ic_agent::{Agent, Identity};
use slog::{debug, info, warn, Logger};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ACCOUNT_LABEL: &str = "Plug Main Wallet";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    pub host: Url,
    pub whitelist: Vec<Principal>,
    pub timeout: Duration,
}

/// The extension's injected API.
#[async_trait]
pub trait ExtensionWallet: Send + Sync {
    async fn is_connected(&self) -> Result<bool, ProviderError>;

    /// Asks the user to approve the connection. `Ok(false)` is a refusal.
    async fn request_connect(&self, request: ConnectRequest) -> Result<bool, ProviderError>;

    fn has_agent(&self) -> bool;

    async fn create_agent(&self, host: &Url, whitelist: &[Principal]) -> Result<(), ProviderError>;

    /// Identity behind the extension's agent.
    async fn session_identity(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError>;

    fn session_agent(&self) -> Option<Agent>;

    async fn disconnect(&self) -> Result<(), ProviderError>;
}

/// Where the extension is looked up. `None` means it is not installed.
pub trait ExtensionWalletHost: Send + Sync {
    fn extension(&self) -> Option<Arc<dyn ExtensionWallet>>;
}

pub struct ExtensionWalletAdapter {
    host: Arc<dyn ExtensionWalletHost>,
    wallet_host: Url,
    connect_timeout: Duration,
    /// Agent handed out by the extension for the current session.
    agent: Mutex<Option<Agent>>,
    /// Whitelist of the last restore or login.
    whitelist: Mutex<Option<Vec<Principal>>>,
    machine: SessionMachine,
}

impl ExtensionWalletAdapter {
    pub fn new(
        host: Arc<dyn ExtensionWalletHost>,
        wallet_host: Url,
        store: SourceStore,
        logger: &Logger,
    ) -> Self {
        Self {
            host,
            wallet_host,
            connect_timeout: CONNECT_TIMEOUT,
            agent: Mutex::new(None),
            whitelist: Mutex::new(None),
            machine: SessionMachine::new(Source::ExtensionWallet, store, logger),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn remember_whitelist(&self, whitelist: &[Principal]) {
        *self.whitelist.lock().unwrap_or_else(PoisonError::into_inner) = Some(whitelist.to_vec());
    }

    fn set_agent(&self, agent: Option<Agent>) {
        *self.agent.lock().unwrap_or_else(PoisonError::into_inner) = agent;
    }

    fn agent(&self) -> Option<Agent> {
        self.agent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Reads the session off a connected extension, creating its agent if needed.
    async fn connected_session(
        &self,
        wallet: &dyn ExtensionWallet,
        whitelist: &[Principal],
    ) -> Result<Option<Session>, ProviderError> {
        if !wallet.has_agent() {
            debug!(self.machine.logger(), "Creating extension agent");
            wallet.create_agent(&self.wallet_host, whitelist).await?;
        }
        let Some(identity) = wallet.session_identity().await? else {
            return Ok(None);
        };
        let principal = identity
            .sender()
            .map_err(ProviderError::InvalidResponse)?;
        self.set_agent(wallet.session_agent());
        Ok(Some(Session {
            accounts: derive_accounts(PrincipalSource::Identity(identity.as_ref()), ACCOUNT_LABEL),
            identity: Some(SessionIdentity::new(identity)),
            principal,
        }))
    }

    async fn restore_session(&self, whitelist: &[Principal]) -> Result<Option<Session>, ProviderError> {
        let Some(wallet) = self.host.extension() else {
            info!(self.machine.logger(), "Extension wallet is not installed");
            return Ok(None);
        };
        if !wallet.is_connected().await? {
            return Ok(None);
        }
        self.connected_session(wallet.as_ref(), whitelist).await
    }

    async fn login_session(&self, whitelist: &[Principal]) -> Result<Option<Session>, ProviderError> {
        let Some(wallet) = self.host.extension() else {
            info!(self.machine.logger(), "Extension wallet is not installed");
            return Ok(None);
        };
        let request = ConnectRequest {
            host: self.wallet_host.clone(),
            whitelist: whitelist.to_vec(),
            timeout: self.connect_timeout,
        };
        let connected = tokio::time::timeout(self.connect_timeout, wallet.request_connect(request))
            .await
            .map_err(|_| ProviderError::Timeout(self.connect_timeout.as_secs()))??;
        if !connected {
            return Ok(None);
        }
        self.connected_session(wallet.as_ref(), whitelist).await
    }
}

#[async_trait]
impl ProviderAdapter for ExtensionWalletAdapter {
    fn source(&self) -> Source {
        Source::ExtensionWallet
    }

    fn snapshot(&self) -> AdapterSnapshot {
        self.machine.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<AdapterSnapshot> {
        self.machine.subscribe()
    }

    async fn restore(&self, context: &LoginContext) {
        self.machine
            .restore_with(|| async move {
                self.remember_whitelist(&context.whitelist);
                let session = self.restore_session(&context.whitelist).await;
                if !matches!(session, Ok(Some(_))) {
                    self.set_agent(None);
                }
                session
            })
            .await
    }

    async fn login(&self, context: &LoginContext) -> Result<bool, LoginError> {
        self.remember_whitelist(&context.whitelist);
        let result = self
            .machine
            .login_with(|| self.login_session(&context.whitelist))
            .await;
        if !matches!(result, Ok(true)) {
            self.set_agent(None);
        }
        match result {
            Ok(logged_in) => Ok(logged_in),
            Err(err) if err.is_network_level() => Err(LoginError {
                source_kind: Source::ExtensionWallet,
                source: err,
            }),
            Err(_) => Ok(false),
        }
    }

    async fn logout(&self) {
        self.machine
            .logout_with(|| async move {
                match self.host.extension() {
                    Some(wallet) => wallet.disconnect().await,
                    None => Ok(()),
                }
            })
            .await;
        self.set_agent(None);
    }

    async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
        _options: &CreateActorOptions,
    ) -> Option<ActorHandle> {
        if !self.machine.is_logged_in() {
            return None;
        }
        let agent = self.agent()?;
        Some(ActorHandle::new(agent, canister_id, interface))
    }

    async fn whitelist_changed(&self, context: &LoginContext) {
        let previous = self
            .whitelist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if previous.as_deref() == Some(context.whitelist.as_slice()) || !self.machine.is_logged_in() {
            return;
        }
        info!(self.machine.logger(), "Whitelist changed, reconnecting");
        match self.login(context).await {
            Ok(true) => {}
            Ok(false) => info!(self.machine.logger(), "Reconnect was not approved"),
            Err(err) => warn!(self.machine.logger(), "Reconnect failed: {}", err),
        }
    }
}
