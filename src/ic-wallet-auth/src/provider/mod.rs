//! Provider adapters: one per wallet kind, all behind [`ProviderAdapter`].
//!
//! Each adapter owns its status and state and publishes them as one
//! [`AdapterSnapshot`] through a watch channel, so observers never see status
//! and state from different moments.
use crate::account::Account;
use crate::actor::{ActorHandle, CreateActorOptions, InterfaceDescriptor};
use crate::error::provider::LoginError;
use crate::source::Source;
use async_trait::async_trait;
use candid::Principal;
use ic_agent::Identity;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

pub mod deep_link;
pub mod delegated;
pub mod extension;
pub mod passkey;
pub mod session;

pub use deep_link::{DeepLinkWallet, DeepLinkWalletAdapter, DeepLinkWalletHost};
pub use delegated::{
    AuthClient, AuthClientFactory, AuthClientLoginOptions, DelegatedIdentityAdapter,
    DelegatedIdentityConfig, WindowGeometry,
};
pub use extension::{ConnectRequest, ExtensionWallet, ExtensionWalletAdapter, ExtensionWalletHost};
pub use passkey::{PasskeyClient, PasskeyClientFactory, PasskeyWalletAdapter};
pub use session::{Session, SessionMachine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthStatus {
    /// A login or restore is in flight.
    pub in_progress: bool,
    /// The restore-on-mount attempt has concluded. Never reverts.
    pub is_ready: bool,
    pub is_logged_in: bool,
}

/// Read-only handle to the identity an adapter holds.
///
/// Two handles are equal when they refer to the same identity object.
#[derive(Clone)]
pub struct SessionIdentity(Arc<dyn Identity>);

impl SessionIdentity {
    pub fn new(identity: Arc<dyn Identity>) -> Self {
        Self(identity)
    }

    pub fn identity(&self) -> Arc<dyn Identity> {
        self.0.clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.0.sender().ok()
    }
}

impl PartialEq for SessionIdentity {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl Debug for SessionIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.principal() {
            Some(principal) => write!(f, "SessionIdentity({})", principal),
            None => f.write_str("SessionIdentity(<no principal>)"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdapterState {
    /// Absent for providers that only disclose a principal.
    pub identity: Option<SessionIdentity>,
    pub principal: Option<Principal>,
    pub accounts: Vec<Account>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdapterSnapshot {
    pub status: AuthStatus,
    pub state: AdapterState,
}

/// Caller-level configuration handed to a provider on restore and login.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginContext {
    /// Identity service endpoint, for delegated-identity providers.
    pub identity_provider: Option<Url>,
    /// Canisters the wallet is asked to authorize.
    pub whitelist: Vec<Principal>,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn snapshot(&self) -> AdapterSnapshot;

    fn subscribe(&self) -> watch::Receiver<AdapterSnapshot>;

    /// Silent session recovery on mount. Runs at most once per adapter;
    /// later calls return immediately.
    async fn restore(&self, context: &LoginContext);

    /// Interactive login. `Ok(false)` covers refusals and failures; `Err` is
    /// reserved for provider failures the caller may want to retry.
    async fn login(&self, context: &LoginContext) -> Result<bool, LoginError>;

    async fn logout(&self);

    /// `None` while logged out or when the provider cannot build a client.
    async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
        options: &CreateActorOptions,
    ) -> Option<ActorHandle>;

    /// Called when the canister whitelist changes.
    async fn whitelist_changed(&self, _context: &LoginContext) {}
}
