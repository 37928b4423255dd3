//! Query handlers for the erc20 conversion module.

use cosmwasm_std::{Env, Order, StdError, StdResult};
use cw_storage_plus::Bound;

use crate::erc20_bridge::{escrow_status, EscrowStatus};
use crate::error::Erc20Error;
use crate::execute::resolve;
use crate::keeper::ModuleDeps;
use crate::msg::{
    ConfigResponse, ParamsResponse, PendingTransferResponse, PendingTransfersResponse,
    TokenPairResponse, TokenPairsResponse,
};
use crate::state::{token_pairs, PendingTransfer, CONFIG, PARAMS, PENDING_TRANSFERS};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 30;

fn into_std(err: Erc20Error) -> StdError {
    match err {
        Erc20Error::Std(e) => e,
        other => StdError::generic_err(other.to_string()),
    }
}

pub fn query_params(deps: ModuleDeps) -> StdResult<ParamsResponse> {
    Ok(ParamsResponse {
        params: PARAMS.load(deps.storage)?,
    })
}

pub fn query_config(deps: ModuleDeps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        authority: config.authority,
        module_address: config.module_address,
        native_denom: config.native_denom,
        exempt_addresses: config.exempt_addresses,
    })
}

// ============================================================================
// Token Pairs
// ============================================================================

/// Look up a pair by id, denom or contract address.
pub fn query_token_pair(deps: ModuleDeps, token: String) -> StdResult<TokenPairResponse> {
    let token_pair = resolve(deps.storage, &token).map_err(into_std)?;
    Ok(TokenPairResponse { token_pair })
}

/// List pairs ordered by id.
pub fn query_token_pairs(
    deps: ModuleDeps,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<TokenPairsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start = start_after.as_deref().map(Bound::exclusive);

    let token_pairs = token_pairs()
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, pair)| pair))
        .collect::<StdResult<Vec<_>>>()?;

    Ok(TokenPairsResponse { token_pairs })
}

/// Escrow backing of a pair, in ledger units.
pub fn query_escrow_status(deps: ModuleDeps, token: String) -> StdResult<EscrowStatus> {
    let pair = resolve(deps.storage, &token).map_err(into_std)?;
    let module = CONFIG
        .load(deps.storage)?
        .module()
        .map_err(into_std)?;
    escrow_status(deps.storage, deps.bank, deps.evm, &pair, &module).map_err(into_std)
}

// ============================================================================
// Pending Transfers
// ============================================================================

pub fn query_pending_transfer(
    deps: ModuleDeps,
    channel: String,
    sequence: u64,
) -> StdResult<PendingTransferResponse> {
    let pending = PENDING_TRANSFERS.may_load(deps.storage, (channel.as_str(), sequence))?;
    Ok(PendingTransferResponse { pending })
}

/// List pending records ordered by (channel, sequence).
///
/// With `expired_only`, only records whose packet timeout has passed are
/// returned: the relay never delivered a terminal event for them.
pub fn query_pending_transfers(
    deps: ModuleDeps,
    env: &Env,
    start_after: Option<(String, u64)>,
    limit: Option<u32>,
    expired_only: bool,
) -> StdResult<PendingTransfersResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start = start_after
        .as_ref()
        .map(|(channel, sequence)| Bound::exclusive((channel.as_str(), *sequence)));

    let height = env.block.height;
    let now = env.block.time.nanos();

    let pending = PENDING_TRANSFERS
        .range(deps.storage, start, None, Order::Ascending)
        .map(|item| item.map(|(_, record)| record))
        .filter(|item| match item {
            Ok(record) => !expired_only || record.is_expired(height, now),
            Err(_) => true,
        })
        .take(limit)
        .collect::<StdResult<Vec<PendingTransfer>>>()?;

    Ok(PendingTransfersResponse { pending })
}
