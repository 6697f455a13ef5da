//! Shared fixtures: a deterministic identity, a discard logger and in-memory
//! stand-ins for every provider SDK.
use crate::actor::{ActorHandle, InterfaceDescriptor};
use crate::error::provider::ProviderError;
use crate::provider::{
    AuthClient, AuthClientFactory, AuthClientLoginOptions, ConnectRequest, DeepLinkWallet,
    DeepLinkWalletHost, ExtensionWallet, ExtensionWalletHost, PasskeyClient, PasskeyClientFactory,
};
use crate::source::{Source, SourceStore};
use crate::storage::InMemoryStore;
use async_trait::async_trait;
use candid::Principal;
use ic_agent::agent::EnvelopeContent;
use ic_agent::identity::AnonymousIdentity;
use ic_agent::{Agent, Identity, Signature};
use slog::{o, Drain, Logger};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const METRICS_DID: &str = r#"
type CanisterMetrics = record { data : vec nat64 };
type GetInformationRequest = record { version : bool; metrics : opt nat };
type GetInformationResponse = record { version : opt nat; metrics : opt CanisterMetrics };
service : {
  getCanistergeekInformation : (GetInformationRequest) -> (GetInformationResponse) query;
  collectCanisterMetrics : () -> ();
}
"#;

const LOCAL_REPLICA: &str = "http://127.0.0.1:4943";

const TEST_STORAGE_KEY: &str = "test__source";

pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Keeps the level and message of every record logged through it.
#[derive(Clone, Default)]
pub struct RecordingDrain(Arc<Mutex<Vec<(slog::Level, String)>>>);

impl RecordingDrain {
    pub fn logger(&self) -> Logger {
        Logger::root(self.clone().fuse(), o!())
    }

    pub fn records(&self) -> Vec<(slog::Level, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl slog::Drain for RecordingDrain {
    type Ok = ();
    type Err = slog::Never;

    fn log(&self, record: &slog::Record<'_>, _: &slog::OwnedKVList) -> Result<(), slog::Never> {
        self.0
            .lock()
            .unwrap()
            .push((record.level(), record.msg().to_string()));
        Ok(())
    }
}

pub fn test_principal(seed: u8) -> Principal {
    Principal::from_slice(&[seed, 0xA5, 0x01])
}

/// A source store over fresh in-memory storage, optionally preselected.
pub fn test_store(source: Option<Source>) -> SourceStore {
    let storage = match source {
        Some(source) => InMemoryStore::with_entry(TEST_STORAGE_KEY, source.as_str()),
        None => InMemoryStore::new(),
    };
    SourceStore::load(Arc::new(storage), TEST_STORAGE_KEY, &test_logger())
}

pub fn metrics_interface() -> Arc<InterfaceDescriptor> {
    Arc::new(InterfaceDescriptor::from_candid(METRICS_DID).unwrap())
}

fn agent_for(identity: Arc<dyn Identity>) -> Agent {
    Agent::builder()
        .with_url(LOCAL_REPLICA)
        .with_arc_identity(identity)
        .build()
        .unwrap()
}

/// Signs nothing; only its principal matters.
pub struct TestIdentity {
    principal: Option<Principal>,
}

impl TestIdentity {
    pub fn new(seed: u8) -> Self {
        Self {
            principal: Some(Principal::self_authenticating([seed; 8])),
        }
    }

    /// An identity whose principal cannot be read.
    pub fn broken() -> Self {
        Self { principal: None }
    }

    pub fn principal(&self) -> Principal {
        self.principal.unwrap()
    }
}

impl Identity for TestIdentity {
    fn sender(&self) -> Result<Principal, String> {
        self.principal.ok_or_else(|| "no principal".to_string())
    }

    fn public_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn sign(&self, _content: &EnvelopeContent) -> Result<Signature, String> {
        Ok(Signature {
            public_key: None,
            signature: None,
            delegations: None,
        })
    }
}

pub struct FakeAuthClient {
    authenticated: AtomicBool,
    identity: Mutex<Arc<dyn Identity>>,
    login_result: Mutex<Result<Arc<TestIdentity>, ProviderError>>,
    login_requests: Mutex<Vec<AuthClientLoginOptions>>,
    pub logouts: AtomicUsize,
}

impl FakeAuthClient {
    pub fn new() -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            identity: Mutex::new(Arc::new(AnonymousIdentity)),
            login_result: Mutex::new(Err(ProviderError::Rejected("UserInterrupt".to_string()))),
            login_requests: Mutex::new(vec![]),
            logouts: AtomicUsize::new(0),
        }
    }

    /// A client holding a delegation from an earlier session.
    pub fn authenticated(identity: Arc<TestIdentity>) -> Self {
        let client = Self::new();
        client.authenticated.store(true, Ordering::SeqCst);
        *client.identity.lock().unwrap() = identity;
        client
    }

    pub fn set_login_result(&self, result: Result<Arc<TestIdentity>, ProviderError>) {
        *self.login_result.lock().unwrap() = result;
    }

    pub fn login_requests(&self) -> Vec<AuthClientLoginOptions> {
        self.login_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthClient for FakeAuthClient {
    async fn is_authenticated(&self) -> Result<bool, ProviderError> {
        Ok(self.authenticated.load(Ordering::SeqCst))
    }

    fn identity(&self) -> Arc<dyn Identity> {
        self.identity.lock().unwrap().clone()
    }

    async fn login(&self, options: AuthClientLoginOptions) -> Result<(), ProviderError> {
        self.login_requests.lock().unwrap().push(options);
        let identity = self.login_result.lock().unwrap().clone()?;
        *self.identity.lock().unwrap() = identity;
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), ProviderError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.authenticated.store(false, Ordering::SeqCst);
        *self.identity.lock().unwrap() = Arc::new(AnonymousIdentity);
        Ok(())
    }
}

pub struct FakeAuthClientFactory {
    client: Arc<FakeAuthClient>,
    pub created: AtomicUsize,
}

impl FakeAuthClientFactory {
    pub fn new(client: Arc<FakeAuthClient>) -> Self {
        Self {
            client,
            created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AuthClientFactory for FakeAuthClientFactory {
    async fn create(&self) -> Result<Arc<dyn AuthClient>, ProviderError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}

pub struct FakeExtensionWallet {
    identity: Arc<TestIdentity>,
    connected: AtomicBool,
    agent: Mutex<Option<Agent>>,
    connect_result: Mutex<Result<bool, ProviderError>>,
    hang: AtomicBool,
    connect_requests: Mutex<Vec<ConnectRequest>>,
    created_agents: Mutex<Vec<Vec<Principal>>>,
    pub disconnects: AtomicUsize,
}

impl FakeExtensionWallet {
    /// Installed and approved earlier, agent not created yet.
    pub fn connected(identity: Arc<TestIdentity>) -> Self {
        let wallet = Self::disconnected(identity);
        wallet.connected.store(true, Ordering::SeqCst);
        wallet
    }

    /// Installed, approves the next connect request.
    pub fn disconnected(identity: Arc<TestIdentity>) -> Self {
        Self {
            identity,
            connected: AtomicBool::new(false),
            agent: Mutex::new(None),
            connect_result: Mutex::new(Ok(true)),
            hang: AtomicBool::new(false),
            connect_requests: Mutex::new(vec![]),
            created_agents: Mutex::new(vec![]),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_connect_result(&self, result: Result<bool, ProviderError>) {
        *self.connect_result.lock().unwrap() = result;
    }

    /// The next connect request never answers.
    pub fn hang_on_connect(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn connect_requests(&self) -> Vec<ConnectRequest> {
        self.connect_requests.lock().unwrap().clone()
    }

    pub fn created_agents(&self) -> Vec<Vec<Principal>> {
        self.created_agents.lock().unwrap().clone()
    }

    fn install_agent(&self) {
        *self.agent.lock().unwrap() = Some(agent_for(self.identity.clone()));
    }
}

#[async_trait]
impl ExtensionWallet for FakeExtensionWallet {
    async fn is_connected(&self) -> Result<bool, ProviderError> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn request_connect(&self, request: ConnectRequest) -> Result<bool, ProviderError> {
        self.connect_requests.lock().unwrap().push(request);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let approved = self.connect_result.lock().unwrap().clone()?;
        if approved {
            self.connected.store(true, Ordering::SeqCst);
            self.install_agent();
        }
        Ok(approved)
    }

    fn has_agent(&self) -> bool {
        self.agent.lock().unwrap().is_some()
    }

    async fn create_agent(&self, _host: &Url, whitelist: &[Principal]) -> Result<(), ProviderError> {
        self.created_agents.lock().unwrap().push(whitelist.to_vec());
        self.install_agent();
        Ok(())
    }

    async fn session_identity(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError> {
        if self.has_agent() {
            Ok(Some(self.identity.clone()))
        } else {
            Ok(None)
        }
    }

    fn session_agent(&self) -> Option<Agent> {
        self.agent.lock().unwrap().clone()
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        *self.agent.lock().unwrap() = None;
        Ok(())
    }
}

pub struct FakeExtensionHost(Option<Arc<FakeExtensionWallet>>);

impl FakeExtensionHost {
    pub fn absent() -> Self {
        Self(None)
    }

    pub fn with(wallet: Arc<FakeExtensionWallet>) -> Self {
        Self(Some(wallet))
    }
}

impl ExtensionWalletHost for FakeExtensionHost {
    fn extension(&self) -> Option<Arc<dyn ExtensionWallet>> {
        self.0
            .clone()
            .map(|wallet| wallet as Arc<dyn ExtensionWallet>)
    }
}

pub struct FakeDeepLinkWallet {
    principal: Principal,
    pub connected: AtomicBool,
    pub agent: AtomicBool,
    connect_error: Mutex<Option<ProviderError>>,
    connect_whitelists: Mutex<Vec<Vec<Principal>>>,
    pub actors_created: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeDeepLinkWallet {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            connected: AtomicBool::new(false),
            agent: AtomicBool::new(false),
            connect_error: Mutex::new(None),
            connect_whitelists: Mutex::new(vec![]),
            actors_created: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn fail_connect(&self, err: ProviderError) {
        *self.connect_error.lock().unwrap() = Some(err);
    }

    pub fn connect_whitelists(&self) -> Vec<Vec<Principal>> {
        self.connect_whitelists.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeepLinkWallet for FakeDeepLinkWallet {
    async fn is_connected(&self) -> Result<bool, ProviderError> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    fn has_agent(&self) -> bool {
        self.agent.load(Ordering::SeqCst)
    }

    async fn request_connect(&self, _host: Option<&Url>, whitelist: &[Principal]) -> Result<(), ProviderError> {
        self.connect_whitelists.lock().unwrap().push(whitelist.to_vec());
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.connected.store(true, Ordering::SeqCst);
        self.agent.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn principal(&self) -> Result<Option<Principal>, ProviderError> {
        Ok(self
            .connected
            .load(Ordering::SeqCst)
            .then_some(self.principal))
    }

    async fn create_actor(
        &self,
        canister_id: Principal,
        interface: Arc<InterfaceDescriptor>,
    ) -> Result<ActorHandle, ProviderError> {
        self.actors_created.fetch_add(1, Ordering::SeqCst);
        let agent = agent_for(Arc::new(AnonymousIdentity));
        Ok(ActorHandle::new(agent, canister_id, interface))
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.agent.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeDeepLinkHost(Option<Arc<FakeDeepLinkWallet>>);

impl FakeDeepLinkHost {
    pub fn absent() -> Self {
        Self(None)
    }

    pub fn with(wallet: Arc<FakeDeepLinkWallet>) -> Self {
        Self(Some(wallet))
    }
}

impl DeepLinkWalletHost for FakeDeepLinkHost {
    fn wallet(&self) -> Option<Arc<dyn DeepLinkWallet>> {
        self.0
            .clone()
            .map(|wallet| wallet as Arc<dyn DeepLinkWallet>)
    }
}

type IdentityResult = Result<Option<Arc<TestIdentity>>, ProviderError>;

pub struct FakePasskeyClient {
    load: Mutex<IdentityResult>,
    connect: Mutex<IdentityResult>,
    accounts: Mutex<Result<String, ProviderError>>,
    pub disconnects: AtomicUsize,
}

impl FakePasskeyClient {
    pub fn new() -> Self {
        Self {
            load: Mutex::new(Ok(None)),
            connect: Mutex::new(Ok(None)),
            accounts: Mutex::new(Ok("[]".to_string())),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_load(&self, result: IdentityResult) {
        *self.load.lock().unwrap() = result;
    }

    pub fn set_connect(&self, result: IdentityResult) {
        *self.connect.lock().unwrap() = result;
    }

    pub fn set_accounts(&self, result: Result<String, ProviderError>) {
        *self.accounts.lock().unwrap() = result;
    }
}

fn as_identity(result: IdentityResult) -> Result<Option<Arc<dyn Identity>>, ProviderError> {
    result.map(|identity| identity.map(|identity| identity as Arc<dyn Identity>))
}

#[async_trait]
impl PasskeyClient for FakePasskeyClient {
    async fn load(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError> {
        as_identity(self.load.lock().unwrap().clone())
    }

    async fn connect(&self) -> Result<Option<Arc<dyn Identity>>, ProviderError> {
        as_identity(self.connect.lock().unwrap().clone())
    }

    async fn accounts(&self) -> Result<String, ProviderError> {
        self.accounts.lock().unwrap().clone()
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePasskeyFactory {
    client: Arc<FakePasskeyClient>,
    pub created: AtomicUsize,
}

impl FakePasskeyFactory {
    pub fn new(client: Arc<FakePasskeyClient>) -> Self {
        Self {
            client,
            created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PasskeyClientFactory for FakePasskeyFactory {
    async fn create(&self) -> Result<Arc<dyn PasskeyClient>, ProviderError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}
