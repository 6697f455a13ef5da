use crate::config::CanisterConfig;
use crate::error::config::LoadAuthConfigError;
use candid::Principal;

/// Canister through which blackhole-sourced metrics are read.
pub const BLACKHOLE_CANISTER_ID: &str = "e3mmv-5qaaa-aaaah-aadma-cai";
pub const BLACKHOLE_METRICS_SOURCE: &str = "blackhole";

/// Canisters a wallet must authorize: every configured canister, plus the
/// blackhole canister when any entry reads its metrics through it.
pub fn prepare_whitelist(
    canisters: &[CanisterConfig],
) -> Result<Vec<Principal>, LoadAuthConfigError> {
    let mut whitelist = canisters
        .iter()
        .map(|canister| {
            Principal::from_text(&canister.canister_id).map_err(|err| {
                LoadAuthConfigError::InvalidCanisterId(canister.canister_id.clone(), err)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let has_blackhole_source = canisters.iter().any(|canister| {
        canister
            .metrics_source
            .iter()
            .any(|source| source == BLACKHOLE_METRICS_SOURCE)
    });
    if has_blackhole_source {
        let blackhole = Principal::from_text(BLACKHOLE_CANISTER_ID).map_err(|err| {
            LoadAuthConfigError::InvalidCanisterId(BLACKHOLE_CANISTER_ID.to_string(), err)
        })?;
        if !whitelist.contains(&blackhole) {
            whitelist.push(blackhole);
        }
    }
    Ok(whitelist)
}
