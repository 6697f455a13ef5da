use crate::account::Account;
use crate::provider::{AdapterSnapshot, AuthStatus, SessionIdentity};
use crate::source::{Source, SourceTag};
use candid::Principal;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateState {
    pub identity: Option<SessionIdentity>,
    pub principal: Option<Principal>,
    pub accounts: Vec<Account>,
    /// Index into `accounts` of the selected account.
    pub current_account: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateSnapshot {
    pub source: Option<SourceTag>,
    pub status: AuthStatus,
    pub state: AggregateState,
}

/// Derives the unified view from the selected source and every adapter's snapshot.
///
/// With no usable selection the view is logged out, and ready as soon as any
/// adapter is ready.
pub fn project(source: Option<&SourceTag>, adapters: &[(Source, AdapterSnapshot)]) -> AggregateSnapshot {
    let active = source
        .and_then(SourceTag::known)
        .and_then(|known| adapters.iter().find(|(candidate, _)| *candidate == known));

    match active {
        Some((_, snapshot)) => AggregateSnapshot {
            source: source.cloned(),
            status: snapshot.status,
            state: AggregateState {
                identity: snapshot.state.identity.clone(),
                principal: snapshot.state.principal,
                accounts: snapshot.state.accounts.clone(),
                current_account: Some(0),
            },
        },
        None => AggregateSnapshot {
            source: source.cloned(),
            status: AuthStatus {
                in_progress: false,
                is_ready: adapters.iter().any(|(_, snapshot)| snapshot.status.is_ready),
                is_logged_in: false,
            },
            state: AggregateState::default(),
        },
    }
}
