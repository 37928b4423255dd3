//! Token contract call bridge.
//!
//! The module only ever talks to token contracts through the fixed ABI
//! below. Calls are ABI encoded with alloy, executed by the [`EvmKeeper`]
//! and their results decoded back into typed values; reverts are decoded
//! into [`CallError`] so callers can tell a short balance from a missing
//! contract.

use alloy::primitives::{b256, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{Revert, SolCall, SolError};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdError, Storage, Uint128};
use thiserror::Error;

use crate::error::Erc20Error;
use crate::hash::erc20_denom;
use crate::interfaces::{BankKeeper, CallOutcome, EvmKeeper};
use crate::state::{ContractOwner, TokenPair};

sol! {
    /// Token interface expected from every paired contract. Contracts
    /// deployed by the module additionally grant it `mint` and `burnCoins`.
    interface IERC20MinterBurnerDecimals {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
        function burnCoins(address from, uint256 amount) external;

        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    }
}

use IERC20MinterBurnerDecimals as token;

/// EIP-1967 logic contract slot: `keccak256("eip1967.proxy.implementation") - 1`
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 beacon slot: `keccak256("eip1967.proxy.beacon") - 1`
pub const EIP1967_BEACON_SLOT: B256 =
    b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// Failure of a single contract call
#[derive(Error, Debug, PartialEq)]
pub enum CallError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("no contract code")]
    ContractNotFound,

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: U256, available: U256 },

    #[error("allowance denied")]
    AllowanceDenied,

    #[error("reverted: {reason}")]
    Reverted { reason: String },
}

impl CallError {
    /// Attach the contract address and lift into the module error
    pub fn into_error(self, contract: &Address) -> Erc20Error {
        let contract = contract.to_checksum(None);
        match self {
            CallError::Std(e) => Erc20Error::Std(e),
            CallError::ContractNotFound => Erc20Error::ContractNotFound { address: contract },
            CallError::InsufficientBalance { needed, available } => {
                Erc20Error::InsufficientContractBalance {
                    contract,
                    needed: saturating_uint128(needed),
                    available: saturating_uint128(available),
                }
            }
            CallError::AllowanceDenied => Erc20Error::AllowanceDenied { contract },
            CallError::Reverted { reason } => Erc20Error::ContractReverted { contract, reason },
        }
    }
}

/// Decode revert data into a call error
pub fn decode_revert(data: &[u8]) -> CallError {
    if data.is_empty() {
        return CallError::Reverted {
            reason: "execution reverted".to_string(),
        };
    }
    if let Ok(e) = token::ERC20InsufficientBalance::abi_decode(data, true) {
        return CallError::InsufficientBalance {
            needed: e.needed,
            available: e.balance,
        };
    }
    if token::ERC20InsufficientAllowance::abi_decode(data, true).is_ok() {
        return CallError::AllowanceDenied;
    }
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return CallError::Reverted {
            reason: revert.reason,
        };
    }
    CallError::Reverted {
        reason: format!("0x{}", hex::encode(data)),
    }
}

pub fn to_u256(amount: Uint128) -> U256 {
    U256::from(amount.u128())
}

/// Narrow a contract amount to ledger width
pub fn to_uint128(amount: U256) -> Result<Uint128, Erc20Error> {
    if amount > U256::from(u128::MAX) {
        return Err(Erc20Error::InvalidAmount {
            reason: format!("contract amount {} exceeds 128 bits", amount),
        });
    }
    Ok(Uint128::new(amount.to::<u128>()))
}

fn saturating_uint128(amount: U256) -> Uint128 {
    to_uint128(amount).unwrap_or(Uint128::MAX)
}

/// Typed handle on one token contract
pub struct Erc20Bridge<'a> {
    evm: &'a dyn EvmKeeper,
    contract: Address,
}

impl<'a> Erc20Bridge<'a> {
    pub fn new(evm: &'a dyn EvmKeeper, contract: Address) -> Self {
        Self { evm, contract }
    }

    fn read<C: SolCall>(&self, store: &dyn Storage, call: C) -> Result<C::Return, CallError> {
        if !self.evm.has_code(store, &self.contract) {
            return Err(CallError::ContractNotFound);
        }
        let outcome = self.evm.query(store, &self.contract, &call.abi_encode())?;
        decode_outcome::<C>(outcome)
    }

    fn write<C: SolCall>(
        &self,
        store: &mut dyn Storage,
        from: &Address,
        call: C,
    ) -> Result<C::Return, CallError> {
        if !self.evm.has_code(store, &self.contract) {
            return Err(CallError::ContractNotFound);
        }
        let outcome = self.evm.call(store, from, &self.contract, &call.abi_encode())?;
        decode_outcome::<C>(outcome)
    }

    pub fn name(&self, store: &dyn Storage) -> Result<String, CallError> {
        Ok(self.read(store, token::nameCall {})?._0)
    }

    pub fn symbol(&self, store: &dyn Storage) -> Result<String, CallError> {
        Ok(self.read(store, token::symbolCall {})?._0)
    }

    pub fn decimals(&self, store: &dyn Storage) -> Result<u8, CallError> {
        Ok(self.read(store, token::decimalsCall {})?._0)
    }

    pub fn total_supply(&self, store: &dyn Storage) -> Result<U256, CallError> {
        Ok(self.read(store, token::totalSupplyCall {})?._0)
    }

    pub fn balance_of(&self, store: &dyn Storage, account: &Address) -> Result<U256, CallError> {
        Ok(self
            .read(store, token::balanceOfCall { account: *account })?
            ._0)
    }

    /// Mint `amount` to `to`; only the owning module may call this
    pub fn mint(
        &self,
        store: &mut dyn Storage,
        module: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), CallError> {
        self.write(store, module, token::mintCall { to: *to, amount })?;
        Ok(())
    }

    /// Burn `amount` held by `from`; only the owning module may call this
    pub fn burn(
        &self,
        store: &mut dyn Storage,
        module: &Address,
        from: &Address,
        amount: U256,
    ) -> Result<(), CallError> {
        self.write(store, module, token::burnCoinsCall { from: *from, amount })?;
        Ok(())
    }

    /// Transfer on behalf of `from`. A `false` return counts as a revert.
    pub fn transfer(
        &self,
        store: &mut dyn Storage,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), CallError> {
        let ok = self
            .write(store, from, token::transferCall { to: *to, amount })?
            ._0;
        if !ok {
            return Err(CallError::Reverted {
                reason: "transfer returned false".to_string(),
            });
        }
        Ok(())
    }

    /// True when either EIP-1967 proxy slot is populated
    pub fn is_upgradeable_proxy(&self, store: &dyn Storage) -> bool {
        [EIP1967_IMPLEMENTATION_SLOT, EIP1967_BEACON_SLOT]
            .into_iter()
            .any(|slot| !self.evm.storage_at(store, &self.contract, slot).is_zero())
    }
}

fn decode_outcome<C: SolCall>(outcome: CallOutcome) -> Result<C::Return, CallError> {
    if outcome.reverted {
        return Err(decode_revert(&outcome.ret));
    }
    C::abi_decode_returns(&outcome.ret, true).map_err(|e| CallError::Reverted {
        reason: format!("invalid return data for {}: {}", C::SIGNATURE, e),
    })
}

/// Backing of one pair, in ledger units
#[cw_serde]
pub struct EscrowStatus {
    pub pair_id: String,
    /// Value the module holds in escrow
    pub escrowed: Uint128,
    /// Value circulating in the converted representation
    pub outstanding: Uint128,
    pub healthy: bool,
}

/// Measure the escrow backing of a pair.
///
/// Module pairs: ledger coins escrowed by the module must cover the contract
/// total supply. External pairs: contract tokens locked by the module must
/// cover the `erc20/…` voucher supply.
pub fn escrow_status(
    store: &dyn Storage,
    bank: &dyn BankKeeper,
    evm: &dyn EvmKeeper,
    pair: &TokenPair,
    module: &Address,
) -> Result<EscrowStatus, Erc20Error> {
    let erc20 = pair.erc20()?;
    let bridge = Erc20Bridge::new(evm, erc20);

    let (escrowed, outstanding) = match pair.contract_owner {
        ContractOwner::Module => {
            let supply = bridge
                .total_supply(store)
                .map_err(|e| e.into_error(&erc20))?;
            (
                bank.balance(store, module, &pair.denom)?,
                pair.erc20_to_coin(to_uint128(supply)?)?,
            )
        }
        ContractOwner::External => {
            let locked = bridge
                .balance_of(store, module)
                .map_err(|e| e.into_error(&erc20))?;
            (
                pair.erc20_to_coin(to_uint128(locked)?)?,
                bank.supply(store, &erc20_denom(&erc20))?,
            )
        }
    };

    Ok(EscrowStatus {
        pair_id: pair.id.clone(),
        escrowed,
        outstanding,
        healthy: escrowed >= outstanding,
    })
}

/// Fail with `EscrowInvariant` when a pair is under-collateralized
pub fn check_escrow_invariant(
    store: &dyn Storage,
    bank: &dyn BankKeeper,
    evm: &dyn EvmKeeper,
    pair: &TokenPair,
    module: &Address,
) -> Result<(), Erc20Error> {
    let status = escrow_status(store, bank, evm, pair, module)?;
    if !status.healthy {
        return Err(Erc20Error::EscrowInvariant {
            pair_id: status.pair_id,
            escrowed: status.escrowed,
            outstanding: status.outstanding,
        });
    }
    Ok(())
}

/// Revert payload in the standard `Error(string)` encoding
pub fn encode_revert_reason(reason: &str) -> Bytes {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
    .into()
}

/// Revert payload for a short balance
pub fn encode_insufficient_balance(sender: Address, balance: U256, needed: U256) -> Bytes {
    token::ERC20InsufficientBalance {
        sender,
        balance,
        needed,
    }
    .abi_encode()
    .into()
}

/// Revert payload for a missing allowance
pub fn encode_insufficient_allowance(spender: Address, allowance: U256, needed: U256) -> Bytes {
    token::ERC20InsufficientAllowance {
        spender,
        allowance,
        needed,
    }
    .abi_encode()
    .into()
}

pub use IERC20MinterBurnerDecimals::{
    balanceOfCall, burnCoinsCall, decimalsCall, mintCall, nameCall, symbolCall, totalSupplyCall,
    transferCall,
};
