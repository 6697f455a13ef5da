//! Caller-level configuration consumed by the aggregator.
use crate::error::config::LoadAuthConfigError;
use crate::json::read_json_file;
use crate::source::store::DEFAULT_SOURCE_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

mod whitelist;

pub use whitelist::{prepare_whitelist, BLACKHOLE_CANISTER_ID, BLACKHOLE_METRICS_SOURCE};

pub const DEFAULT_IC_GATEWAY: &str = "https://icp0.io";
pub const DEFAULT_EXTENSION_WALLET_HOST: &str = "https://mainnet.dfinity.network";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Replica or boundary node the generic actor factory talks to.
    pub host: Url,

    /// Production builds trust the hard-coded root key; others fetch it.
    #[serde(default = "default_production")]
    pub production: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_ic_gateway(),
            production: true,
        }
    }
}

/// One entry of the externally owned canister registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanisterConfig {
    pub canister_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metrics_source: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    #[serde(default)]
    pub delegated_identity_a_url: Option<Url>,

    #[serde(default)]
    pub delegated_identity_b_url: Option<Url>,

    #[serde(default = "default_extension_wallet_host")]
    pub extension_wallet_host: Url,

    /// Left to the wallet's own default when unset.
    #[serde(default)]
    pub deep_link_wallet_host: Option<Url>,

    #[serde(default)]
    pub canisters: Vec<CanisterConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            storage_key: default_storage_key(),
            delegated_identity_a_url: None,
            delegated_identity_b_url: None,
            extension_wallet_host: default_extension_wallet_host(),
            deep_link_wallet_host: None,
            canisters: vec![],
        }
    }
}

impl AuthConfig {
    pub fn load(path: &Path) -> Result<Self, LoadAuthConfigError> {
        let config: AuthConfig =
            read_json_file(path).map_err(LoadAuthConfigError::LoadConfigFailed)?;
        prepare_whitelist(&config.canisters)?;
        Ok(config)
    }
}

fn default_production() -> bool {
    true
}

fn default_storage_key() -> String {
    DEFAULT_SOURCE_STORAGE_KEY.to_string()
}

fn default_ic_gateway() -> Url {
    Url::parse(DEFAULT_IC_GATEWAY).expect("default gateway url is valid")
}

fn default_extension_wallet_host() -> Url {
    Url::parse(DEFAULT_EXTENSION_WALLET_HOST).expect("default extension wallet url is valid")
}
