//! Pair registry handlers.
//!
//! Pairs are created by the authority only and are never deleted; the only
//! mutable field is `enabled`. Lookups by denom and by contract address go
//! through the unique indexes of [`token_pairs`].

use alloy::primitives::Address;
use cosmwasm_std::{Event, Response, StdResult, Storage};
use tracing::info;

use common::Metadata;

use crate::address::{parse_account, parse_hex_address};
use crate::erc20_bridge::{CallError, Erc20Bridge};
use crate::error::Erc20Error;
use crate::hash::{erc20_denom, is_pair_id, ERC20_DENOM_PREFIX};
use crate::keeper::ModuleDepsMut;
use crate::state::{
    token_pairs, ContractOwner, Params, TokenPair, CONFIG, MAX_COIN_EXPONENT,
    MAX_ERC20_DECIMALS, PARAMS,
};

// ============================================================================
// Lookups
// ============================================================================

pub fn find_by_denom(store: &dyn Storage, denom: &str) -> StdResult<Option<TokenPair>> {
    Ok(token_pairs()
        .idx
        .denom
        .item(store, denom.to_string())?
        .map(|(_, pair)| pair))
}

pub fn find_by_contract(store: &dyn Storage, erc20: &Address) -> StdResult<Option<TokenPair>> {
    Ok(token_pairs()
        .idx
        .erc20
        .item(store, erc20.to_checksum(None))?
        .map(|(_, pair)| pair))
}

pub fn lookup_by_id(store: &dyn Storage, id: &str) -> Result<TokenPair, Erc20Error> {
    token_pairs()
        .may_load(store, id)?
        .ok_or_else(|| Erc20Error::PairNotFound {
            token: id.to_string(),
        })
}

pub fn lookup_by_denom(store: &dyn Storage, denom: &str) -> Result<TokenPair, Erc20Error> {
    find_by_denom(store, denom)?.ok_or_else(|| Erc20Error::PairNotFound {
        token: denom.to_string(),
    })
}

pub fn lookup_by_contract(store: &dyn Storage, erc20: &Address) -> Result<TokenPair, Erc20Error> {
    find_by_contract(store, erc20)?.ok_or_else(|| Erc20Error::PairNotFound {
        token: erc20.to_checksum(None),
    })
}

/// Resolve a pair from its id, its contract address (hex) or its denom.
/// A denom shaped like a pair id is still found by denom.
pub fn resolve(store: &dyn Storage, token: &str) -> Result<TokenPair, Erc20Error> {
    if is_pair_id(token) {
        if let Some(pair) = token_pairs().may_load(store, token)? {
            return Ok(pair);
        }
    }
    if token.starts_with("0x") && token.len() == 42 {
        let erc20 = parse_hex_address(token)?;
        return lookup_by_contract(store, &erc20);
    }
    lookup_by_denom(store, token)
}

fn ensure_authority(store: &dyn Storage, sender: &Address) -> Result<(), Erc20Error> {
    let config = CONFIG.load(store)?;
    let got = sender.to_checksum(None);
    if got != config.authority {
        return Err(Erc20Error::Unauthorized {
            expected: config.authority,
            got,
        });
    }
    Ok(())
}

// ============================================================================
// Registration
// ============================================================================

/// Register a native coin, deploying a managed token contract for it.
pub fn execute_register_coin(
    deps: ModuleDepsMut,
    sender: &Address,
    metadata: Metadata,
) -> Result<Response, Erc20Error> {
    ensure_authority(deps.storage, sender)?;

    metadata
        .validate()
        .map_err(|e| Erc20Error::InvalidMetadata {
            reason: e.to_string(),
        })?;

    let denom = metadata.base.clone();
    if denom.starts_with(ERC20_DENOM_PREFIX) {
        return Err(Erc20Error::ReservedDenom { denom });
    }

    let exponent = metadata
        .display_exponent()
        .ok_or_else(|| Erc20Error::InvalidMetadata {
            reason: format!("display unit {} is not listed", metadata.display),
        })?;
    if exponent > MAX_COIN_EXPONENT {
        return Err(Erc20Error::UnsupportedExponent {
            exponent,
            max: MAX_COIN_EXPONENT,
        });
    }

    if find_by_denom(deps.storage, &denom)?.is_some() {
        return Err(Erc20Error::DuplicatePair {
            reason: format!("coin {} already has a token pair", denom),
        });
    }

    if deps.bank.supply(deps.storage, &denom)?.is_zero() {
        return Err(Erc20Error::CoinNotFound { denom });
    }

    let decimals = exponent.min(MAX_ERC20_DECIMALS as u32) as u8;
    let module = CONFIG.load(deps.storage)?.module()?;
    let erc20 = deps.evm.deploy_erc20(
        deps.storage,
        &module,
        &metadata.name,
        &metadata.symbol,
        decimals,
    )?;

    if find_by_contract(deps.storage, &erc20)?.is_some() {
        return Err(Erc20Error::DuplicatePair {
            reason: format!("contract {} already has a token pair", erc20),
        });
    }

    let pair = TokenPair::new(&erc20, denom, ContractOwner::Module, exponent, decimals);
    token_pairs().save(deps.storage, pair.id.as_str(), &pair)?;

    info!(
        pair_id = %pair.id,
        denom = %pair.denom,
        erc20 = %pair.erc20_address,
        decimals,
        "registered coin"
    );

    Ok(Response::new()
        .add_attribute("method", "register_coin")
        .add_event(
            Event::new("register_coin")
                .add_attribute("pair_id", &pair.id)
                .add_attribute("denom", &pair.denom)
                .add_attribute("erc20_address", &pair.erc20_address)
                .add_attribute("coin_exponent", pair.coin_exponent.to_string())
                .add_attribute("erc20_decimals", pair.erc20_decimals.to_string()),
        ))
}

/// Register an existing token contract. Its coins live on the ledger as
/// `erc20/<checksum>` vouchers.
pub fn execute_register_erc20(
    deps: ModuleDepsMut,
    sender: &Address,
    erc20_address: String,
) -> Result<Response, Erc20Error> {
    ensure_authority(deps.storage, sender)?;

    let erc20 = parse_account(&erc20_address)?;
    let checksum = erc20.to_checksum(None);

    if !deps.evm.has_code(deps.storage, &erc20) {
        return Err(Erc20Error::ContractNotFound { address: checksum });
    }

    if find_by_contract(deps.storage, &erc20)?.is_some() {
        return Err(Erc20Error::DuplicatePair {
            reason: format!("contract {} already has a token pair", checksum),
        });
    }
    let denom = erc20_denom(&erc20);
    if find_by_denom(deps.storage, &denom)?.is_some() {
        return Err(Erc20Error::DuplicatePair {
            reason: format!("coin {} already has a token pair", denom),
        });
    }

    let module = CONFIG.load(deps.storage)?.module()?;
    let bridge = Erc20Bridge::new(deps.evm, erc20);
    let unsupported = |method: &str| {
        let address = checksum.clone();
        let method = method.to_string();
        move |_: CallError| Erc20Error::UnsupportedContractInterface { address, method }
    };

    let name = bridge.name(deps.storage).map_err(unsupported("name()"))?;
    let symbol = bridge.symbol(deps.storage).map_err(unsupported("symbol()"))?;
    let decimals = bridge
        .decimals(deps.storage)
        .map_err(unsupported("decimals()"))?;
    bridge
        .total_supply(deps.storage)
        .map_err(unsupported("totalSupply()"))?;
    bridge
        .balance_of(deps.storage, &module)
        .map_err(unsupported("balanceOf(address)"))?;

    if bridge.is_upgradeable_proxy(deps.storage) {
        return Err(Erc20Error::UpgradeableContract { address: checksum });
    }

    let pair = TokenPair::new(
        &erc20,
        denom,
        ContractOwner::External,
        decimals as u32,
        decimals,
    );
    token_pairs().save(deps.storage, pair.id.as_str(), &pair)?;

    info!(
        pair_id = %pair.id,
        erc20 = %pair.erc20_address,
        name = %name,
        symbol = %symbol,
        decimals,
        "registered erc20"
    );

    Ok(Response::new()
        .add_attribute("method", "register_erc20")
        .add_event(
            Event::new("register_erc20")
                .add_attribute("pair_id", &pair.id)
                .add_attribute("denom", &pair.denom)
                .add_attribute("erc20_address", &pair.erc20_address)
                .add_attribute("name", name)
                .add_attribute("symbol", symbol),
        ))
}

// ============================================================================
// Enablement & Params
// ============================================================================

/// Flip the enabled flag of a pair.
pub fn execute_toggle_conversion(
    deps: ModuleDepsMut,
    sender: &Address,
    token: String,
) -> Result<Response, Erc20Error> {
    ensure_authority(deps.storage, sender)?;
    let pair = resolve(deps.storage, &token)?;
    let enabled = !pair.enabled;
    save_enabled(deps, pair, enabled, "toggle_conversion")
}

/// Set the enabled flag of a pair.
pub fn execute_set_enabled(
    deps: ModuleDepsMut,
    sender: &Address,
    token: String,
    enabled: bool,
) -> Result<Response, Erc20Error> {
    ensure_authority(deps.storage, sender)?;
    let pair = resolve(deps.storage, &token)?;
    save_enabled(deps, pair, enabled, "set_enabled")
}

fn save_enabled(
    deps: ModuleDepsMut,
    mut pair: TokenPair,
    enabled: bool,
    method: &str,
) -> Result<Response, Erc20Error> {
    pair.enabled = enabled;
    token_pairs().save(deps.storage, pair.id.as_str(), &pair)?;

    info!(pair_id = %pair.id, enabled, "token pair enablement changed");

    Ok(Response::new()
        .add_attribute("method", method)
        .add_event(
            Event::new("toggle_token_conversion")
                .add_attribute("pair_id", &pair.id)
                .add_attribute("denom", &pair.denom)
                .add_attribute("erc20_address", &pair.erc20_address)
                .add_attribute("enabled", enabled.to_string()),
        ))
}

/// Check that the policy lists only hold well-formed pair ids
pub fn validate_params(params: &Params) -> Result<(), Erc20Error> {
    for id in params
        .enabled_pair_ids
        .iter()
        .chain(params.disabled_pair_ids.iter())
    {
        if !is_pair_id(id) {
            return Err(Erc20Error::InvalidParams {
                reason: format!("{} is not a token pair id", id),
            });
        }
    }
    Ok(())
}

/// Replace the conversion parameters.
pub fn execute_update_params(
    deps: ModuleDepsMut,
    sender: &Address,
    params: Params,
) -> Result<Response, Erc20Error> {
    ensure_authority(deps.storage, sender)?;
    validate_params(&params)?;
    PARAMS.save(deps.storage, &params)?;

    info!(
        enable_conversion = params.enable_conversion,
        allowlist = params.enabled_pair_ids.len(),
        denylist = params.disabled_pair_ids.len(),
        "params updated"
    );

    Ok(Response::new()
        .add_attribute("method", "update_params")
        .add_attribute("enable_conversion", params.enable_conversion.to_string()))
}
