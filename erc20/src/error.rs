//! Error types for the erc20 conversion module

use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Erc20Error {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Unauthorized: expected {expected}, got {got}")]
    Unauthorized { expected: String, got: String },

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    // ========================================================================
    // Registry Errors
    // ========================================================================

    #[error("Token pair not found: {token}")]
    PairNotFound { token: String },

    #[error("Token pair already registered: {reason}")]
    DuplicatePair { reason: String },

    #[error("Invalid coin metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("Unsupported denomination exponent {exponent}, maximum is {max}")]
    UnsupportedExponent { exponent: u32, max: u32 },

    #[error("Coin {denom} has no supply on this chain")]
    CoinNotFound { denom: String },

    #[error("Denomination {denom} is reserved for registered contracts")]
    ReservedDenom { denom: String },

    #[error("Contract {address} does not implement {method}")]
    UnsupportedContractInterface { address: String, method: String },

    #[error("Contract {address} is an upgradeable proxy")]
    UpgradeableContract { address: String },

    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    // ========================================================================
    // Conversion Errors
    // ========================================================================

    #[error("Token conversions are disabled")]
    ConversionDisabled,

    #[error("Token pair {token} is disabled")]
    PairDisabled { token: String },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Insufficient {denom} balance: needed {needed}, available {available}")]
    InsufficientLedgerBalance {
        denom: String,
        needed: Uint128,
        available: Uint128,
    },

    #[error("Insufficient balance on contract {contract}: needed {needed}, available {available}")]
    InsufficientContractBalance {
        contract: String,
        needed: Uint128,
        available: Uint128,
    },

    #[error("Amount {amount} is not a multiple of {unit} and would lose precision")]
    PrecisionLoss { amount: Uint128, unit: Uint128 },

    // ========================================================================
    // Contract Call Errors
    // ========================================================================

    #[error("Contract {contract} reverted: {reason}")]
    ContractReverted { contract: String, reason: String },

    #[error("No contract code at {address}")]
    ContractNotFound { address: String },

    #[error("Allowance denied by contract {contract}")]
    AllowanceDenied { contract: String },

    #[error("Balance invariant broken on {contract}: expected {expected}, got {actual}")]
    BalanceInvariant {
        contract: String,
        expected: Uint128,
        actual: Uint128,
    },

    #[error("Escrow invariant broken for pair {pair_id}: escrowed {escrowed} < outstanding {outstanding}")]
    EscrowInvariant {
        pair_id: String,
        escrowed: Uint128,
        outstanding: Uint128,
    },

    // ========================================================================
    // Transfer Hook Errors
    // ========================================================================

    #[error("Invalid packet: {reason}")]
    InvalidPacket { reason: String },

    #[error("Transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("Reversal of packet {channel}/{sequence} failed: {reason}")]
    ReversalFailed {
        channel: String,
        sequence: u64,
        reason: String,
    },
}
