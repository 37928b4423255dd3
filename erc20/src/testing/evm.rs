//! Store-backed token contract engine.
//!
//! Every contract deployed here behaves like an OpenZeppelin ERC20 with an
//! owner-restricted `mint` and `burnCoins`. Faults can be injected per
//! (contract, selector) to exercise revert and misbehaviour paths.

use std::cell::RefCell;
use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, StdError, StdResult, Storage, Uint128};
use cw_storage_plus::{Item, Map};

use crate::erc20_bridge::{
    balanceOfCall, burnCoinsCall, decimalsCall, encode_insufficient_balance,
    encode_revert_reason, mintCall, nameCall, symbolCall, totalSupplyCall, transferCall,
};
use crate::hash::sha256;
use crate::interfaces::{CallOutcome, EvmKeeper};

#[cw_serde]
enum ContractKind {
    Token,
    /// Code without any token interface
    Opaque,
}

#[cw_serde]
struct MockContract {
    kind: ContractKind,
    name: String,
    symbol: String,
    decimals: u8,
    /// Account allowed to mint and burn; anyone when unset
    owner: Option<String>,
}

const CONTRACTS: Map<&str, MockContract> = Map::new("mock_evm_contracts");

/// Balances keyed by (contract, account)
const BALANCES: Map<(&str, &str), Uint128> = Map::new("mock_evm_balances");

const SUPPLY: Map<&str, Uint128> = Map::new("mock_evm_supply");

const SLOTS: Map<(&str, &[u8]), Binary> = Map::new("mock_evm_slots");

const DEPLOY_NONCE: Item<u64> = Item::new("mock_evm_nonce");

/// Injected misbehaviour of one contract method
#[derive(Clone, Debug, PartialEq)]
pub enum Fault {
    /// Revert with an `Error(string)` reason
    Revert(String),
    /// Revert with no data
    RevertEmpty,
    /// Return `false` from `transfer`
    ReturnFalse,
    /// Report success without touching state
    Silent,
    /// Return undecodable data
    Garbage,
}

#[derive(Default)]
pub struct MockEvm {
    faults: RefCell<HashMap<(Address, [u8; 4]), Fault>>,
}

fn key(address: &Address) -> String {
    address.to_checksum(None)
}

fn narrow(amount: U256) -> Option<Uint128> {
    if amount > U256::from(u128::MAX) {
        None
    } else {
        Some(Uint128::new(amount.to::<u128>()))
    }
}

impl MockEvm {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    pub fn inject(&self, contract: Address, selector: [u8; 4], fault: Fault) {
        self.faults.borrow_mut().insert((contract, selector), fault);
    }

    pub fn clear(&self, contract: Address, selector: [u8; 4]) {
        self.faults.borrow_mut().remove(&(contract, selector));
    }

    pub fn clear_all(&self) {
        self.faults.borrow_mut().clear();
    }

    fn fault(&self, contract: &Address, selector: [u8; 4]) -> Option<Fault> {
        self.faults.borrow().get(&(*contract, selector)).cloned()
    }

    // ========================================================================
    // Direct state access
    // ========================================================================

    fn next_address(&self, store: &mut dyn Storage) -> StdResult<Address> {
        let nonce = DEPLOY_NONCE.may_load(store)?.unwrap_or_default();
        DEPLOY_NONCE.save(store, &(nonce + 1))?;
        let mut preimage = b"mock_evm".to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Ok(Address::from_slice(&sha256(&preimage)[..20]))
    }

    /// Deploy a token; `owner` of `None` lets anyone mint
    pub fn deploy_token(
        &self,
        store: &mut dyn Storage,
        owner: Option<&Address>,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> StdResult<Address> {
        let address = self.next_address(store)?;
        let contract = MockContract {
            kind: ContractKind::Token,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            owner: owner.map(key),
        };
        CONTRACTS.save(store, &key(&address), &contract)?;
        Ok(address)
    }

    /// Deploy code that implements no token method
    pub fn deploy_opaque(&self, store: &mut dyn Storage) -> StdResult<Address> {
        let address = self.next_address(store)?;
        let contract = MockContract {
            kind: ContractKind::Opaque,
            name: String::new(),
            symbol: String::new(),
            decimals: 0,
            owner: None,
        };
        CONTRACTS.save(store, &key(&address), &contract)?;
        Ok(address)
    }

    pub fn set_storage(
        &self,
        store: &mut dyn Storage,
        contract: &Address,
        slot: B256,
        value: B256,
    ) -> StdResult<()> {
        SLOTS.save(
            store,
            (key(contract).as_str(), slot.as_slice()),
            &Binary::from(value.as_slice()),
        )
    }

    pub fn balance(&self, store: &dyn Storage, contract: &Address, account: &Address) -> Uint128 {
        BALANCES
            .may_load(store, (key(contract).as_str(), key(account).as_str()))
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn total_supply(&self, store: &dyn Storage, contract: &Address) -> Uint128 {
        SUPPLY
            .may_load(store, key(contract).as_str())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Mint without going through the contract's access control
    pub fn mint_to(
        &self,
        store: &mut dyn Storage,
        contract: &Address,
        to: &Address,
        amount: Uint128,
    ) -> StdResult<()> {
        let balance = self.balance(store, contract, to).checked_add(amount)?;
        BALANCES.save(store, (key(contract).as_str(), key(to).as_str()), &balance)?;
        let supply = self.total_supply(store, contract).checked_add(amount)?;
        SUPPLY.save(store, key(contract).as_str(), &supply)
    }

    fn burn_from(
        &self,
        store: &mut dyn Storage,
        contract: &Address,
        from: &Address,
        amount: Uint128,
    ) -> StdResult<()> {
        let balance = self.balance(store, contract, from).checked_sub(amount)?;
        BALANCES.save(store, (key(contract).as_str(), key(from).as_str()), &balance)?;
        let supply = self.total_supply(store, contract).checked_sub(amount)?;
        SUPPLY.save(store, key(contract).as_str(), &supply)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    fn load(&self, store: &dyn Storage, contract: &Address) -> StdResult<MockContract> {
        CONTRACTS
            .may_load(store, &key(contract))?
            .ok_or_else(|| StdError::not_found(format!("contract {}", contract)))
    }

    fn faulted(&self, contract: &Address, data: &[u8]) -> Option<CallOutcome> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let fault = self.fault(contract, selector)?;
        Some(match fault {
            Fault::Revert(reason) => CallOutcome::revert(encode_revert_reason(&reason)),
            Fault::RevertEmpty => CallOutcome::revert(Bytes::new()),
            Fault::ReturnFalse => CallOutcome::success(transferCall::abi_encode_returns(&(false,))),
            Fault::Silent if selector == transferCall::SELECTOR => {
                CallOutcome::success(transferCall::abi_encode_returns(&(true,)))
            }
            Fault::Silent => CallOutcome::success(Bytes::new()),
            Fault::Garbage => CallOutcome::success(Bytes::from_static(&[0xde, 0xad])),
        })
    }

    fn view(&self, store: &dyn Storage, contract: &Address, data: &[u8]) -> CallOutcome {
        let Ok(info) = self.load(store, contract) else {
            return CallOutcome::success(Bytes::new());
        };
        if info.kind == ContractKind::Opaque || data.len() < 4 {
            return CallOutcome::revert(Bytes::new());
        }

        let selector = &data[..4];
        if selector == nameCall::SELECTOR {
            CallOutcome::success(nameCall::abi_encode_returns(&(info.name,)))
        } else if selector == symbolCall::SELECTOR {
            CallOutcome::success(symbolCall::abi_encode_returns(&(info.symbol,)))
        } else if selector == decimalsCall::SELECTOR {
            CallOutcome::success(decimalsCall::abi_encode_returns(&(info.decimals,)))
        } else if selector == totalSupplyCall::SELECTOR {
            let supply = U256::from(self.total_supply(store, contract).u128());
            CallOutcome::success(totalSupplyCall::abi_encode_returns(&(supply,)))
        } else if selector == balanceOfCall::SELECTOR {
            match balanceOfCall::abi_decode(data, true) {
                Ok(call) => {
                    let balance = U256::from(self.balance(store, contract, &call.account).u128());
                    CallOutcome::success(balanceOfCall::abi_encode_returns(&(balance,)))
                }
                Err(_) => CallOutcome::revert(Bytes::new()),
            }
        } else {
            CallOutcome::revert(Bytes::new())
        }
    }

    fn only_owner(info: &MockContract, caller: &Address) -> Option<CallOutcome> {
        match &info.owner {
            Some(owner) if *owner != key(caller) => Some(CallOutcome::revert(
                encode_revert_reason("Ownable: caller is not the owner"),
            )),
            _ => None,
        }
    }

    fn execute(
        &self,
        store: &mut dyn Storage,
        caller: &Address,
        contract: &Address,
        data: &[u8],
    ) -> StdResult<CallOutcome> {
        let info = match self.load(store, contract) {
            Ok(info) => info,
            // Calls to accounts without code succeed and do nothing
            Err(_) => return Ok(CallOutcome::success(Bytes::new())),
        };
        if info.kind == ContractKind::Opaque || data.len() < 4 {
            return Ok(CallOutcome::revert(Bytes::new()));
        }

        let selector = &data[..4];
        if selector == transferCall::SELECTOR {
            let Ok(call) = transferCall::abi_decode(data, true) else {
                return Ok(CallOutcome::revert(Bytes::new()));
            };
            let Some(amount) = narrow(call.amount) else {
                return Ok(CallOutcome::revert(encode_revert_reason("amount overflow")));
            };
            let balance = self.balance(store, contract, caller);
            if balance < amount {
                return Ok(CallOutcome::revert(encode_insufficient_balance(
                    *caller,
                    U256::from(balance.u128()),
                    call.amount,
                )));
            }
            self.burn_from(store, contract, caller, amount)?;
            self.mint_to(store, contract, &call.to, amount)?;
            Ok(CallOutcome::success(transferCall::abi_encode_returns(&(true,))))
        } else if selector == mintCall::SELECTOR {
            if let Some(denied) = Self::only_owner(&info, caller) {
                return Ok(denied);
            }
            let Ok(call) = mintCall::abi_decode(data, true) else {
                return Ok(CallOutcome::revert(Bytes::new()));
            };
            let Some(amount) = narrow(call.amount) else {
                return Ok(CallOutcome::revert(encode_revert_reason("amount overflow")));
            };
            self.mint_to(store, contract, &call.to, amount)?;
            Ok(CallOutcome::success(Bytes::new()))
        } else if selector == burnCoinsCall::SELECTOR {
            if let Some(denied) = Self::only_owner(&info, caller) {
                return Ok(denied);
            }
            let Ok(call) = burnCoinsCall::abi_decode(data, true) else {
                return Ok(CallOutcome::revert(Bytes::new()));
            };
            let Some(amount) = narrow(call.amount) else {
                return Ok(CallOutcome::revert(encode_revert_reason("amount overflow")));
            };
            let balance = self.balance(store, contract, &call.from);
            if balance < amount {
                return Ok(CallOutcome::revert(encode_insufficient_balance(
                    call.from,
                    U256::from(balance.u128()),
                    call.amount,
                )));
            }
            self.burn_from(store, contract, &call.from, amount)?;
            Ok(CallOutcome::success(Bytes::new()))
        } else {
            Ok(self.view(store, contract, data))
        }
    }
}

impl EvmKeeper for MockEvm {
    fn has_code(&self, store: &dyn Storage, contract: &Address) -> bool {
        CONTRACTS.has(store, &key(contract))
    }

    fn storage_at(&self, store: &dyn Storage, contract: &Address, slot: B256) -> B256 {
        SLOTS
            .may_load(store, (key(contract).as_str(), slot.as_slice()))
            .ok()
            .flatten()
            .filter(|value| value.len() == 32)
            .map(|value| B256::from_slice(value.as_slice()))
            .unwrap_or(B256::ZERO)
    }

    fn query(
        &self,
        store: &dyn Storage,
        contract: &Address,
        data: &[u8],
    ) -> StdResult<CallOutcome> {
        if let Some(outcome) = self.faulted(contract, data) {
            return Ok(outcome);
        }
        Ok(self.view(store, contract, data))
    }

    fn call(
        &self,
        store: &mut dyn Storage,
        from: &Address,
        contract: &Address,
        data: &[u8],
    ) -> StdResult<CallOutcome> {
        if let Some(outcome) = self.faulted(contract, data) {
            return Ok(outcome);
        }
        self.execute(store, from, contract, data)
    }

    fn deploy_erc20(
        &self,
        store: &mut dyn Storage,
        owner: &Address,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> StdResult<Address> {
        self.deploy_token(store, Some(owner), name, symbol, decimals)
    }
}
