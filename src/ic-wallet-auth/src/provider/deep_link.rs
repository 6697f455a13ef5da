//! Adapter for a wallet that only discloses a principal and builds actors itself.
use crate::account::{derive_accounts, PrincipalSource};
use crate::actor::{ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::error::provider::{LoginError, ProviderError};
use crate::provider::{AdapterSnapshot, LoginContext, ProviderAdapter, Session, SessionMachine};
use crate::source::{Source, SourceStore};
use async_trait::async_trait;
use candid::Principal;
use slog::{error, info, Logger};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

pub const ACCOUNT_LABEL: &str = "Infinity Wallet";

#[async_trait]
pub trait DeepLinkWallet: Send + Sync {
    async fn is_connected(&self) -> Result<bool, ProviderError>;

    fn has_agent(&self) -> bool;

    /// `host` of `None` lets the wallet use its own default.
    async fn request_connect(&self, host: Option<&Url>, whitelist: &[Principal]) -> Result<(), ProviderError>;

    async fn principal(&self) -> Result<Option<Principal>, ProviderError>;

    async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
    ) -> Result<ActorHandle, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;
}

pub trait DeepLinkWalletHost: Send + Sync {
    fn wallet(&self) -> Option<Arc<dyn DeepLinkWallet>>;
}

pub struct DeepLinkWalletAdapter {
    host: Arc<dyn DeepLinkWalletHost>,
    wallet_host: Option<Url>,
    machine: SessionMachine,
}

impl DeepLinkWalletAdapter {
    pub fn new(
        host: Arc<dyn DeepLinkWalletHost>,
        wallet_host: Option<Url>,
        store: SourceStore,
        logger: &Logger,
    ) -> Self {
        Self {
            host,
            wallet_host,
            machine: SessionMachine::new(Source::DeepLinkWallet, store, logger),
        }
    }

    fn wallet(&self) -> Option<Arc<dyn DeepLinkWallet>> {
        let wallet = self.host.wallet();
        if wallet.is_none() {
            info!(self.machine.logger(), "Deep-link wallet is not available");
        }
        wallet
    }

    async fn session(&self, wallet: &dyn DeepLinkWallet) -> Result<Option<Session>, ProviderError> {
        Ok(wallet.principal().await?.map(|principal| Session {
            identity: None,
            accounts: derive_accounts(PrincipalSource::Principal(&principal), ACCOUNT_LABEL),
            principal,
        }))
    }

    async fn restore_session(&self, whitelist: &[Principal]) -> Result<Option<Session>, ProviderError> {
        let Some(wallet) = self.wallet() else {
            return Ok(None);
        };
        if !wallet.is_connected().await? || !wallet.has_agent() {
            wallet
                .request_connect(self.wallet_host.as_ref(), whitelist)
                .await?;
        }
        self.session(wallet.as_ref()).await
    }

    async fn login_session(&self, whitelist: &[Principal]) -> Result<Option<Session>, ProviderError> {
        let Some(wallet) = self.wallet() else {
            return Ok(None);
        };
        wallet
            .request_connect(self.wallet_host.as_ref(), whitelist)
            .await?;
        self.session(wallet.as_ref()).await
    }
}

#[async_trait]
impl ProviderAdapter for DeepLinkWalletAdapter {
    fn source(&self) -> Source {
        Source::DeepLinkWallet
    }

    fn snapshot(&self) -> AdapterSnapshot {
        self.machine.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<AdapterSnapshot> {
        self.machine.subscribe()
    }

    async fn restore(&self, context: &LoginContext) {
        self.machine
            .restore_with(|| self.restore_session(&context.whitelist))
            .await
    }

    async fn login(&self, context: &LoginContext) -> Result<bool, LoginError> {
        match self
            .machine
            .login_with(|| self.login_session(&context.whitelist))
            .await
        {
            Ok(logged_in) => Ok(logged_in),
            Err(err) if err.is_network_level() => Err(LoginError {
                source_kind: Source::DeepLinkWallet,
                source: err,
            }),
            Err(_) => Ok(false),
        }
    }

    async fn logout(&self) {
        self.machine
            .logout_with(|| async move {
                match self.host.wallet() {
                    Some(wallet) => wallet.disconnect().await,
                    None => Ok(()),
                }
            })
            .await
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
        let wallet = self.host.wallet()?;
        match wallet.create_actor(canister_id, interface).await {
            Ok(actor) => Some(actor),
            Err(err) => {
                error!(
                    self.machine.logger(),
                    "cannot create actor for {}: {}", canister_id, err
                );
                None
            }
        }
    }
}
