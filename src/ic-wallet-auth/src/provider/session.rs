use crate::account::Account;
use crate::error::provider::ProviderError;
use crate::provider::{AdapterSnapshot, AdapterState, SessionIdentity};
use crate::source::{Source, SourceStore};
use candid::Principal;
use slog::{debug, error, info, o, warn, Logger};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// What a successful provider handshake yields.
#[derive(Clone, Debug)]
pub struct Session {
    pub identity: Option<SessionIdentity>,
    pub principal: Principal,
    pub accounts: Vec<Account>,
}

impl Session {
    fn is_anonymous(&self) -> bool {
        self.principal == Principal::anonymous()
    }
}

/// The restore/login/logout skeleton every adapter shares.
///
/// Adapters supply only the provider handshake; this type owns the published
/// snapshot and every write to the source store made on the adapter's behalf.
pub struct SessionMachine {
    source: Source,
    store: SourceStore,
    snapshot: watch::Sender<AdapterSnapshot>,
    restored: AtomicBool,
    logger: Logger,
}

impl SessionMachine {
    pub fn new(source: Source, store: SourceStore, logger: &Logger) -> Self {
        let (snapshot, _) = watch::channel(AdapterSnapshot::default());
        Self {
            source,
            store,
            snapshot,
            restored: AtomicBool::new(false),
            logger: logger.new(o!("provider" => source.as_str())),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn snapshot(&self) -> AdapterSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdapterSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.snapshot.borrow().status.is_logged_in
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.snapshot.borrow().state.identity.clone()
    }

    /// Runs `attempt` if the store selects this adapter, otherwise settles
    /// logged out. Either way the adapter is ready afterwards.
    pub async fn restore_with<F, Fut>(&self, attempt: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Session>, ProviderError>>,
    {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }
        let current = self.snapshot();
        if current.status.is_logged_in || current.status.in_progress {
            // a login started before the mount; let it own the outcome
            self.update(|snapshot| snapshot.status.is_ready = true);
            return;
        }
        if !self.store.points_at(self.source) {
            self.settle_logged_out(true);
            return;
        }

        debug!(self.logger, "Restoring session");
        self.update(|snapshot| snapshot.status.in_progress = true);
        match attempt().await {
            Ok(Some(session)) if !session.is_anonymous() => {
                info!(self.logger, "Restored session for {}", session.principal);
                self.settle_logged_in(session, true);
            }
            Ok(_) => {
                debug!(self.logger, "No session to restore");
                self.settle_logged_out(true);
            }
            Err(err) => {
                error!(self.logger, "restore: caught error: {}", err);
                self.settle_logged_out(true);
            }
        }
    }

    /// Claims the source store, then runs the handshake. Provider errors are
    /// handed back after the adapter has settled logged out.
    pub async fn login_with<F, Fut>(&self, attempt: F) -> Result<bool, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Session>, ProviderError>>,
    {
        self.store.claim(self.source);
        self.update(|snapshot| snapshot.status.in_progress = true);
        match attempt().await {
            Ok(Some(session)) if !session.is_anonymous() => {
                info!(self.logger, "Logged in as {}", session.principal);
                self.settle_logged_in(session, false);
                Ok(true)
            }
            Ok(Some(_)) => {
                warn!(self.logger, "login: provider returned an anonymous identity");
                self.fail_login();
                Ok(false)
            }
            Ok(None) => {
                info!(self.logger, "login: no identity obtained");
                self.fail_login();
                Ok(false)
            }
            Err(err) => {
                error!(self.logger, "login: caught error: {}", err);
                self.fail_login();
                Err(err)
            }
        }
    }

    /// Settles a login attempt as failed: logged out, selection released.
    pub fn fail_login(&self) {
        self.settle_logged_out(false);
    }

    /// Logs out locally no matter how the provider disconnect ends.
    pub async fn logout_with<F, Fut>(&self, disconnect: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        if let Err(err) = disconnect().await {
            error!(self.logger, "logout: caught error: {}", err);
        }
        self.store.release(self.source);
        self.update(|snapshot| {
            snapshot.status.is_logged_in = false;
            snapshot.state = AdapterState::default();
        });
        info!(self.logger, "Logged out");
    }

    fn settle_logged_in(&self, session: Session, mark_ready: bool) {
        self.update(|snapshot| {
            snapshot.status.in_progress = false;
            snapshot.status.is_logged_in = true;
            if mark_ready {
                snapshot.status.is_ready = true;
            }
            snapshot.state = AdapterState {
                identity: session.identity,
                principal: Some(session.principal),
                accounts: session.accounts,
            };
        });
    }

    fn settle_logged_out(&self, mark_ready: bool) {
        self.store.release(self.source);
        self.update(|snapshot| {
            snapshot.status.in_progress = false;
            snapshot.status.is_logged_in = false;
            if mark_ready {
                snapshot.status.is_ready = true;
            }
            snapshot.state = AdapterState::default();
        });
    }

    fn update(&self, modify: impl FnOnce(&mut AdapterSnapshot)) {
        self.snapshot.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            modify(snapshot);
            *snapshot != before
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::testing::{test_logger, test_store, TestIdentity};
    use std::sync::Arc;

    fn session(seed: u8) -> Session {
        let identity = Arc::new(TestIdentity::new(seed));
        Session {
            principal: identity.principal(),
            identity: Some(SessionIdentity::new(identity)),
            accounts: vec![],
        }
    }

    #[tokio::test]
    async fn restore_without_selection_only_marks_ready() {
        let store = test_store(None);
        let machine = SessionMachine::new(Source::PasskeyWallet, store.clone(), &test_logger());
        let mut attempted = false;
        machine
            .restore_with(|| {
                attempted = true;
                async { Ok(Some(session(1))) }
            })
            .await;
        assert!(!attempted);
        let status = machine.snapshot().status;
        assert!(status.is_ready && !status.is_logged_in && !status.in_progress);
    }

    #[tokio::test]
    async fn restore_runs_once() {
        let store = test_store(Some(Source::PasskeyWallet));
        let machine = SessionMachine::new(Source::PasskeyWallet, store.clone(), &test_logger());
        machine.restore_with(|| async { Ok(Some(session(1))) }).await;
        assert!(machine.is_logged_in());

        machine.logout_with(|| async { Ok(()) }).await;
        machine.restore_with(|| async { Ok(Some(session(2))) }).await;
        assert!(!machine.is_logged_in());
        assert!(machine.snapshot().status.is_ready);
    }

    #[tokio::test]
    async fn failed_restore_releases_only_own_selection() {
        let store = test_store(Some(Source::DeepLinkWallet));
        let machine = SessionMachine::new(Source::DeepLinkWallet, store.clone(), &test_logger());
        machine
            .restore_with(|| async { Err(ProviderError::Unavailable) })
            .await;
        assert_eq!(store.source(), None);
        assert!(machine.snapshot().status.is_ready);
    }

    #[tokio::test]
    async fn in_progress_is_visible_during_login() {
        let store = test_store(None);
        let machine = SessionMachine::new(Source::DelegatedIdentityA, store.clone(), &test_logger());
        let observed = machine
            .login_with(|| {
                let status = machine.snapshot().status;
                let claimed = store.points_at(Source::DelegatedIdentityA);
                async move {
                    assert!(status.in_progress);
                    assert!(claimed);
                    Ok(Some(session(4)))
                }
            })
            .await;
        assert_eq!(observed, Ok(true));
        let snapshot = machine.snapshot();
        assert!(!snapshot.status.in_progress);
        assert!(snapshot.status.is_logged_in);
        assert!(!snapshot.status.is_ready);
        assert_eq!(snapshot.state.principal, Some(TestIdentity::new(4).principal()));
    }

    #[tokio::test]
    async fn anonymous_login_is_a_failure() {
        let store = test_store(None);
        let machine = SessionMachine::new(Source::DelegatedIdentityB, store.clone(), &test_logger());
        let anonymous = Session {
            identity: None,
            principal: Principal::anonymous(),
            accounts: vec![],
        };
        let result = machine.login_with(|| async { Ok(Some(anonymous)) }).await;
        assert_eq!(result, Ok(false));
        assert_eq!(store.source(), None);
        assert_eq!(machine.snapshot().state, AdapterState::default());
    }

    #[tokio::test]
    async fn provider_error_is_returned_after_settling() {
        let store = test_store(None);
        let machine = SessionMachine::new(Source::ExtensionWallet, store.clone(), &test_logger());
        let result = machine
            .login_with(|| async { Err(ProviderError::Network("offline".to_string())) })
            .await;
        assert_eq!(result, Err(ProviderError::Network("offline".to_string())));
        assert_eq!(store.source(), None);
        assert!(!machine.snapshot().status.in_progress);
    }

    #[tokio::test]
    async fn logout_survives_disconnect_failure() {
        let store = test_store(Some(Source::PasskeyWallet));
        let machine = SessionMachine::new(Source::PasskeyWallet, store.clone(), &test_logger());
        machine.restore_with(|| async { Ok(Some(session(5))) }).await;
        machine
            .logout_with(|| async { Err(ProviderError::Network("gone".to_string())) })
            .await;
        assert!(!machine.is_logged_in());
        assert_eq!(store.source(), None);
        assert_eq!(machine.identity(), None);
    }

    #[tokio::test]
    async fn logout_leaves_other_selection_alone() {
        let storage = Arc::new(InMemoryStore::new());
        let store = SourceStore::load(storage, "key", &test_logger());
        store.claim(Source::ExtensionWallet);
        let machine = SessionMachine::new(Source::PasskeyWallet, store.clone(), &test_logger());
        machine.logout_with(|| async { Ok(()) }).await;
        assert!(store.points_at(Source::ExtensionWallet));
    }
}
