//! The unified authentication context over every provider adapter.
use crate::account::Account;
use crate::actor::{create_actor_generic, ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::config::{prepare_whitelist, AuthConfig, CanisterConfig};
use crate::error::actor::CreateActorError;
use crate::error::aggregator::BuildAggregatorError;
use crate::error::config::LoadAuthConfigError;
use crate::error::provider::LoginError;
use crate::provider::{
    AuthClientFactory, DeepLinkWalletAdapter, DeepLinkWalletHost, DelegatedIdentityAdapter,
    DelegatedIdentityConfig, ExtensionWalletAdapter, ExtensionWalletHost, LoginContext,
    PasskeyClientFactory, PasskeyWalletAdapter, ProviderAdapter,
};
use crate::source::{Source, SourceStore, SourceTag};
use crate::storage::KeyValueStore;
use candid::Principal;
use futures::future::{join_all, select_all};
use slog::{debug, info, o, warn, Logger};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

mod projection;

pub use projection::{project, AggregateSnapshot, AggregateState};

type LogoutCallback = Box<dyn Fn() + Send + Sync>;

type ChangeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), watch::error::RecvError>> + Send + 'a>>;

/// Provider SDK entry points, one per wallet kind.
pub struct ProviderSdks {
    pub delegated_identity_a: Arc<dyn AuthClientFactory>,
    pub delegated_identity_b: Arc<dyn AuthClientFactory>,
    pub extension_wallet: Arc<dyn ExtensionWalletHost>,
    pub deep_link_wallet: Arc<dyn DeepLinkWalletHost>,
    pub passkey_wallet: Arc<dyn PasskeyClientFactory>,
}

pub struct AggregatorBuilder {
    config: AuthConfig,
    store: SourceStore,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    on_logout: Option<LogoutCallback>,
    logger: Logger,
}

impl AggregatorBuilder {
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Invoked after every logout, whatever its outcome.
    pub fn on_logout(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_logout = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Result<Aggregator, BuildAggregatorError> {
        for (position, adapter) in self.adapters.iter().enumerate() {
            let source = adapter.source();
            if self.adapters[..position]
                .iter()
                .any(|earlier| earlier.source() == source)
            {
                return Err(BuildAggregatorError::DuplicateAdapter(source));
            }
        }
        let whitelist = prepare_whitelist(&self.config.canisters)?;
        let (mirror, _) = watch::channel(AggregateSnapshot::default());
        let aggregator = Aggregator {
            config: RwLock::new(self.config),
            whitelist: RwLock::new(whitelist),
            store: self.store,
            adapters: self.adapters,
            mirror,
            on_logout: self.on_logout,
            logger: self.logger,
        };
        aggregator.sync();
        Ok(aggregator)
    }
}

pub struct Aggregator {
    config: RwLock<AuthConfig>,
    whitelist: RwLock<Vec<Principal>>,
    store: SourceStore,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    mirror: watch::Sender<AggregateSnapshot>,
    on_logout: Option<LogoutCallback>,
    logger: Logger,
}

impl Aggregator {
    pub fn builder(config: AuthConfig, store: SourceStore, logger: &Logger) -> AggregatorBuilder {
        AggregatorBuilder {
            config,
            store,
            adapters: vec![],
            on_logout: None,
            logger: logger.new(o!("component" => "aggregator")),
        }
    }

    /// One adapter per wallet kind, sharing a source store kept in `storage`
    /// under the configured key.
    pub fn with_providers(
        config: AuthConfig,
        storage: Arc<dyn KeyValueStore>,
        sdks: ProviderSdks,
        logger: &Logger,
    ) -> Result<Self, BuildAggregatorError> {
        let store = SourceStore::load(storage, &config.storage_key, logger);
        let network = config.network.clone();
        let deep_link_host = config
            .deep_link_wallet_host
            .clone()
            .or_else(|| (!network.production).then(|| network.host.clone()));

        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(DelegatedIdentityAdapter::new(
                DelegatedIdentityConfig::primary(),
                sdks.delegated_identity_a,
                store.clone(),
                network.clone(),
                logger,
            )),
            Arc::new(DelegatedIdentityAdapter::new(
                DelegatedIdentityConfig::secondary(),
                sdks.delegated_identity_b,
                store.clone(),
                network.clone(),
                logger,
            )),
            Arc::new(ExtensionWalletAdapter::new(
                sdks.extension_wallet,
                config.extension_wallet_host.clone(),
                store.clone(),
                logger,
            )),
            Arc::new(DeepLinkWalletAdapter::new(
                sdks.deep_link_wallet,
                deep_link_host,
                store.clone(),
                logger,
            )),
            Arc::new(PasskeyWalletAdapter::new(
                sdks.passkey_wallet,
                store.clone(),
                network,
                logger,
            )),
        ];

        adapters
            .into_iter()
            .fold(Aggregator::builder(config, store, logger), |builder, adapter| {
                builder.with_adapter(adapter)
            })
            .build()
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    pub fn adapter(&self, source: Source) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|adapter| adapter.source() == source)
    }

    pub fn whitelist(&self) -> Vec<Principal> {
        self.whitelist
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn login_context(&self, source: Source) -> LoginContext {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let identity_provider = match source {
            Source::DelegatedIdentityA => config.delegated_identity_a_url.clone(),
            Source::DelegatedIdentityB => config.delegated_identity_b_url.clone(),
            _ => None,
        };
        LoginContext {
            identity_provider,
            whitelist: self.whitelist(),
        }
    }

    /// Restores every adapter concurrently.
    pub async fn mount(&self) {
        debug!(self.logger, "Mounting"; "source" => self.store.source().map(|tag| tag.to_string()));
        let contexts: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| self.login_context(adapter.source()))
            .collect();
        join_all(
            self.adapters
                .iter()
                .zip(contexts.iter())
                .map(|(adapter, context)| adapter.restore(context)),
        )
        .await;
        self.sync();
    }

    /// `Ok(false)` for a tag no adapter answers to.
    pub async fn login(&self, source: impl Into<SourceTag> + Send) -> Result<bool, LoginError> {
        let tag = source.into();
        let Some(adapter) = tag.known().and_then(|source| self.adapter(source)) else {
            warn!(self.logger, "No provider for login source {}", tag);
            return Ok(false);
        };
        let context = self.login_context(adapter.source());
        let result = adapter.login(&context).await;
        self.sync();
        result
    }

    pub async fn logout(&self, source: impl Into<SourceTag> + Send) {
        let tag = source.into();
        match tag.known().and_then(|source| self.adapter(source)) {
            Some(adapter) => adapter.logout().await,
            None => warn!(self.logger, "No provider for logout source {}", tag),
        }
        self.sync();
        if let Some(on_logout) = &self.on_logout {
            on_logout();
        }
    }

    /// Selects `accounts[index]`. Out-of-range indices are ignored.
    pub fn switch_account(&self, index: usize) {
        self.sync();
        self.mirror.send_if_modified(|snapshot| {
            if index < snapshot.state.accounts.len() && snapshot.state.current_account != Some(index) {
                snapshot.state.current_account = Some(index);
                true
            } else {
                false
            }
        });
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        self.sync()
    }

    pub fn current_principal(&self) -> Option<Principal> {
        let snapshot = self.snapshot();
        if snapshot.status.is_ready && snapshot.status.is_logged_in {
            snapshot.state.principal
        } else {
            None
        }
    }

    pub fn current_account(&self) -> Option<Account> {
        let snapshot = self.snapshot();
        if !(snapshot.status.is_ready && snapshot.status.is_logged_in) {
            return None;
        }
        let index = snapshot.state.current_account?;
        snapshot.state.accounts.get(index).cloned()
    }

    /// Through the active adapter when logged in, anonymous otherwise.
    pub async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
        options: &CreateActorOptions,
    ) -> Result<Option<ActorHandle>, CreateActorError> {
        let snapshot = self.snapshot();
        if snapshot.status.is_logged_in {
            let adapter = snapshot
                .source
                .as_ref()
                .and_then(SourceTag::known)
                .and_then(|source| self.adapter(source));
            return Ok(match adapter {
                Some(adapter) => adapter.create_actor(canister_id, interface, options).await,
                None => None,
            });
        }
        let network = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .network
            .clone();
        create_actor_generic(canister_id, interface, options, &network, &self.logger)
            .await
            .map(Some)
    }

    /// Replaces the canister registry. Adapters hear about the new whitelist
    /// only when it actually changed.
    pub async fn update_canisters(
        &self,
        canisters: Vec<CanisterConfig>,
    ) -> Result<(), LoadAuthConfigError> {
        let whitelist = prepare_whitelist(&canisters)?;
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .canisters = canisters;
        let changed = {
            let mut current = self.whitelist.write().unwrap_or_else(PoisonError::into_inner);
            let changed = *current != whitelist;
            *current = whitelist;
            changed
        };
        if changed {
            info!(self.logger, "Canister whitelist changed");
            for adapter in &self.adapters {
                let context = self.login_context(adapter.source());
                adapter.whitelist_changed(&context).await;
            }
            self.sync();
        }
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<AggregateSnapshot> {
        self.mirror.subscribe()
    }

    /// Republishes the view whenever the source store or any adapter
    /// changes. Runs until every watched channel has closed.
    pub async fn mirror(&self) {
        let mut store = self.store.subscribe();
        let mut adapters: Vec<_> = self.adapters.iter().map(|adapter| adapter.subscribe()).collect();
        self.sync();
        loop {
            let mut changes: Vec<ChangeFuture<'_>> = Vec::with_capacity(adapters.len() + 1);
            changes.push(Box::pin(store.changed()));
            for receiver in adapters.iter_mut() {
                changes.push(Box::pin(receiver.changed()));
            }
            let (result, _, remaining) = select_all(changes).await;
            drop(remaining);
            if result.is_err() {
                debug!(self.logger, "A watched channel closed, mirror stopped");
                return;
            }
            self.sync();
        }
    }

    /// Recomputes the projection and publishes it if it changed. The current
    /// account survives unless the source or the account list changed.
    fn sync(&self) -> AggregateSnapshot {
        let source = self.store.source();
        let snapshots: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| (adapter.source(), adapter.snapshot()))
            .collect();
        let mut next = project(source.as_ref(), &snapshots);
        self.mirror.send_if_modified(|current| {
            if next.source == current.source && next.state.accounts == current.state.accounts {
                next.state.current_account = current.state.current_account;
            }
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        self.mirror.borrow().clone()
    }
}
