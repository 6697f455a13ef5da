//! Display-level accounts derived from an authenticated identity.
use crate::account::account_identifier::{AccountIdentifier, Subaccount};
use candid::Principal;
use ic_agent::Identity;
use serde::{Deserialize, Serialize};

pub mod account_identifier;

/// Subaccount every single-account provider reports.
pub const DEFAULT_SUBACCOUNT_INDEX: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub name: String,
    pub account_identifier: String,
}

/// What an account list can be derived from.
pub enum PrincipalSource<'a> {
    Identity(&'a dyn Identity),
    Principal(&'a Principal),
}

impl PrincipalSource<'_> {
    fn principal(&self) -> Option<Principal> {
        match self {
            PrincipalSource::Identity(identity) => identity.sender().ok(),
            PrincipalSource::Principal(principal) => Some(**principal),
        }
    }
}

/// One account named `label`, addressed by the principal's default subaccount.
/// Yields an empty list if no principal can be obtained.
pub fn derive_accounts(from: PrincipalSource<'_>, label: &str) -> Vec<Account> {
    match from.principal() {
        Some(principal) => vec![Account {
            name: label.to_string(),
            account_identifier: principal_to_account_identifier(
                &principal,
                DEFAULT_SUBACCOUNT_INDEX,
            ),
        }],
        None => vec![],
    }
}

pub fn principal_to_account_identifier(principal: &Principal, subaccount_index: u32) -> String {
    AccountIdentifier::new(principal, Some(Subaccount::from_index(subaccount_index))).to_hex()
}

#[derive(Deserialize)]
struct ProviderAccount {
    name: String,
    address: String,
}

/// Parses the JSON account list some providers return (`[{name, address}]`).
/// Anything malformed yields an empty list.
pub fn parse_provider_accounts(payload: Option<&str>) -> Vec<Account> {
    let Some(payload) = payload else {
        return vec![];
    };
    match serde_json::from_str::<Vec<ProviderAccount>>(payload) {
        Ok(accounts) => accounts
            .into_iter()
            .map(|account| Account {
                name: account.name,
                account_identifier: account.address,
            })
            .collect(),
        Err(_) => vec![],
    }
}
