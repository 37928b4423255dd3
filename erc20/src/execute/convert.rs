//! Conversion engine.
//!
//! Moves value between the ledger representation and the contract
//! representation of a pair. Each conversion touches both stores; it runs on
//! the caller's cache branch, so a failing contract call also discards the
//! ledger side.
//!
//! | owner    | coin -> erc20                      | erc20 -> coin                       |
//! |----------|------------------------------------|-------------------------------------|
//! | Module   | escrow coins, `mint` tokens        | `burnCoins` tokens, release escrow  |
//! | External | burn vouchers, release locked tokens | lock tokens, mint vouchers        |

use alloy::primitives::{Address, U256};
use cosmwasm_std::{Coin, Event, Response, Uint128};
use tracing::debug;

use crate::address::parse_account;
use crate::erc20_bridge::{check_escrow_invariant, to_u256, to_uint128, Erc20Bridge};
use crate::error::Erc20Error;
use crate::execute::registry::{lookup_by_contract, lookup_by_denom};
use crate::keeper::ModuleDepsMut;
use crate::state::{ContractOwner, Params, TokenPair, CONFIG, PARAMS};

/// Completed conversion, in both unit systems
#[derive(Clone, Debug, PartialEq)]
pub struct Conversion {
    pub pair_id: String,
    pub denom: String,
    pub erc20_address: String,
    /// Amount in ledger units
    pub coin_amount: Uint128,
    /// Amount in contract units
    pub erc20_amount: Uint128,
    pub sender: Address,
    pub receiver: Address,
}

impl Conversion {
    pub fn to_event(&self, ty: &str) -> Event {
        Event::new(ty)
            .add_attribute("pair_id", &self.pair_id)
            .add_attribute("sender", self.sender.to_checksum(None))
            .add_attribute("receiver", self.receiver.to_checksum(None))
            .add_attribute("amount", self.coin_amount.to_string())
            .add_attribute("denom", &self.denom)
            .add_attribute("erc20_amount", self.erc20_amount.to_string())
            .add_attribute("erc20_address", &self.erc20_address)
    }
}

/// Fail unless conversions are on and the pair is enabled and allowed
pub fn ensure_active(params: &Params, pair: &TokenPair) -> Result<(), Erc20Error> {
    if !params.enable_conversion {
        return Err(Erc20Error::ConversionDisabled);
    }
    if !params.is_pair_active(pair) {
        return Err(Erc20Error::PairDisabled {
            token: pair.id.clone(),
        });
    }
    Ok(())
}

fn ensure_positive(amount: Uint128) -> Result<(), Erc20Error> {
    if amount.is_zero() {
        return Err(Erc20Error::InvalidAmount {
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

fn ensure_not_module(account: &Address, module: &Address) -> Result<(), Erc20Error> {
    if account == module {
        return Err(Erc20Error::InvalidAddress {
            reason: format!("module account {} cannot convert", module),
        });
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Convert ledger coins of the sender into contract tokens.
pub fn execute_convert_coin(
    deps: ModuleDepsMut,
    sender: &Address,
    coin: Coin,
    receiver: Option<String>,
) -> Result<Response, Erc20Error> {
    ensure_positive(coin.amount)?;
    let params = PARAMS.load(deps.storage)?;
    if !params.enable_conversion {
        return Err(Erc20Error::ConversionDisabled);
    }
    let pair = lookup_by_denom(deps.storage, &coin.denom)?;
    ensure_active(&params, &pair)?;

    let receiver = match receiver {
        Some(r) => parse_account(&r)?,
        None => *sender,
    };

    let conversion = convert_coin(deps, &pair, sender, &receiver, coin.amount)?;

    Ok(Response::new()
        .add_attribute("method", "convert_coin")
        .add_event(conversion.to_event("convert_coin")))
}

/// Convert contract tokens of the sender into ledger coins.
pub fn execute_convert_erc20(
    deps: ModuleDepsMut,
    sender: &Address,
    contract_address: String,
    amount: Uint128,
    receiver: Option<String>,
) -> Result<Response, Erc20Error> {
    ensure_positive(amount)?;
    let params = PARAMS.load(deps.storage)?;
    if !params.enable_conversion {
        return Err(Erc20Error::ConversionDisabled);
    }
    let erc20 = parse_account(&contract_address)?;
    let pair = lookup_by_contract(deps.storage, &erc20)?;
    ensure_active(&params, &pair)?;

    let receiver = match receiver {
        Some(r) => parse_account(&r)?,
        None => *sender,
    };

    let conversion = convert_erc20(deps, &pair, sender, &receiver, amount)?;

    Ok(Response::new()
        .add_attribute("method", "convert_erc20")
        .add_event(conversion.to_event("convert_erc20")))
}

// ============================================================================
// Engine
// ============================================================================

/// Ledger -> contract. `amount` is in ledger units.
///
/// Enablement is the caller's concern: reversals of failed transfers must
/// go through even while a pair is disabled.
pub fn convert_coin(
    deps: ModuleDepsMut,
    pair: &TokenPair,
    holder: &Address,
    receiver: &Address,
    amount: Uint128,
) -> Result<Conversion, Erc20Error> {
    ensure_positive(amount)?;
    let module = CONFIG.load(deps.storage)?.module()?;
    ensure_not_module(holder, &module)?;
    ensure_not_module(receiver, &module)?;

    let available = deps.bank.balance(deps.storage, holder, &pair.denom)?;
    if available < amount {
        return Err(Erc20Error::InsufficientLedgerBalance {
            denom: pair.denom.clone(),
            needed: amount,
            available,
        });
    }
    let erc20_amount = pair.coin_to_erc20(amount)?;

    let erc20 = pair.erc20()?;
    let bridge = Erc20Bridge::new(deps.evm, erc20);
    let before = bridge
        .balance_of(deps.storage, receiver)
        .map_err(|e| e.into_error(&erc20))?;

    match pair.contract_owner {
        ContractOwner::Module => {
            deps.bank
                .send(deps.storage, holder, &module, &pair.denom, amount)?;
            bridge
                .mint(deps.storage, &module, receiver, to_u256(erc20_amount))
                .map_err(|e| e.into_error(&erc20))?;
        }
        ContractOwner::External => {
            deps.bank.debit(deps.storage, holder, &pair.denom, amount)?;
            bridge
                .transfer(deps.storage, &module, receiver, to_u256(erc20_amount))
                .map_err(|e| e.into_error(&erc20))?;
        }
    }

    let after = bridge
        .balance_of(deps.storage, receiver)
        .map_err(|e| e.into_error(&erc20))?;
    ensure_balance_moved(&erc20, before.checked_add(to_u256(erc20_amount)), after)?;
    check_escrow_invariant(deps.storage, deps.bank, deps.evm, pair, &module)?;

    debug!(
        pair_id = %pair.id,
        holder = %holder,
        receiver = %receiver,
        amount = %amount,
        erc20_amount = %erc20_amount,
        "converted coin to erc20"
    );

    Ok(Conversion {
        pair_id: pair.id.clone(),
        denom: pair.denom.clone(),
        erc20_address: pair.erc20_address.clone(),
        coin_amount: amount,
        erc20_amount,
        sender: *holder,
        receiver: *receiver,
    })
}

/// Contract -> ledger. `amount` is in contract units.
pub fn convert_erc20(
    deps: ModuleDepsMut,
    pair: &TokenPair,
    holder: &Address,
    receiver: &Address,
    amount: Uint128,
) -> Result<Conversion, Erc20Error> {
    ensure_positive(amount)?;
    let module = CONFIG.load(deps.storage)?.module()?;
    ensure_not_module(holder, &module)?;
    ensure_not_module(receiver, &module)?;

    let coin_amount = pair.erc20_to_coin(amount)?;

    let erc20 = pair.erc20()?;
    let bridge = Erc20Bridge::new(deps.evm, erc20);
    let before = bridge
        .balance_of(deps.storage, holder)
        .map_err(|e| e.into_error(&erc20))?;
    if before < to_u256(amount) {
        return Err(Erc20Error::InsufficientContractBalance {
            contract: erc20.to_checksum(None),
            needed: amount,
            available: to_uint128(before)?,
        });
    }

    match pair.contract_owner {
        ContractOwner::Module => {
            bridge
                .burn(deps.storage, &module, holder, to_u256(amount))
                .map_err(|e| e.into_error(&erc20))?;
            deps.bank
                .send(deps.storage, &module, receiver, &pair.denom, coin_amount)?;
        }
        ContractOwner::External => {
            bridge
                .transfer(deps.storage, holder, &module, to_u256(amount))
                .map_err(|e| e.into_error(&erc20))?;
            deps.bank
                .credit(deps.storage, receiver, &pair.denom, coin_amount)?;
        }
    }

    let after = bridge
        .balance_of(deps.storage, holder)
        .map_err(|e| e.into_error(&erc20))?;
    ensure_balance_moved(&erc20, before.checked_sub(to_u256(amount)), after)?;
    check_escrow_invariant(deps.storage, deps.bank, deps.evm, pair, &module)?;

    debug!(
        pair_id = %pair.id,
        holder = %holder,
        receiver = %receiver,
        amount = %coin_amount,
        erc20_amount = %amount,
        "converted erc20 to coin"
    );

    Ok(Conversion {
        pair_id: pair.id.clone(),
        denom: pair.denom.clone(),
        erc20_address: pair.erc20_address.clone(),
        coin_amount,
        erc20_amount: amount,
        sender: *holder,
        receiver: *receiver,
    })
}

/// The contract must have moved exactly the requested amount
fn ensure_balance_moved(
    erc20: &Address,
    expected: Option<U256>,
    actual: U256,
) -> Result<(), Erc20Error> {
    match expected {
        Some(expected) if expected == actual => Ok(()),
        expected => Err(Erc20Error::BalanceInvariant {
            contract: erc20.to_checksum(None),
            expected: to_uint128(expected.unwrap_or(U256::MAX)).unwrap_or(Uint128::MAX),
            actual: to_uint128(actual).unwrap_or(Uint128::MAX),
        }),
    }
}
