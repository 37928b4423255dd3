//! Message types for the erc20 conversion module
//!
//! This module defines the instantiate, execute and query messages of the
//! module, together with the query responses.

use common::Metadata;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Uint128};

use crate::erc20_bridge::EscrowStatus;
use crate::state::{Params, PendingTransfer, TokenPair};

// ============================================================================
// Instantiate & Migrate
// ============================================================================

/// Migrate message
#[cw_serde]
pub struct MigrateMsg {}

/// Instantiate message
#[cw_serde]
pub struct InstantiateMsg {
    /// Governance account allowed to manage pairs and params
    pub authority: String,
    /// Escrow account of the module; derived from the module name when unset
    pub module_address: Option<String>,
    /// The chain's staking denomination
    pub native_denom: String,
    /// Receivers exempt from forced conversion of incoming transfers
    #[serde(default)]
    pub exempt_addresses: Vec<String>,
    /// Initial parameters; conversions are enabled when unset
    pub params: Option<Params>,
}

// ============================================================================
// Execute Messages
// ============================================================================

/// Execute messages
#[cw_serde]
pub enum ExecuteMsg {
    // ========================================================================
    // Conversions
    // ========================================================================
    /// Convert ledger coins into contract tokens
    ConvertCoin {
        coin: Coin,
        /// Defaults to the sender
        receiver: Option<String>,
    },

    /// Convert contract tokens into ledger coins. `amount` is in contract units.
    ConvertErc20 {
        contract_address: String,
        amount: Uint128,
        /// Defaults to the sender
        receiver: Option<String>,
    },

    // ========================================================================
    // Pair Registry (authority only)
    // ========================================================================
    /// Deploy a token contract for a native coin
    RegisterCoin { metadata: Metadata },

    /// Register an existing token contract
    RegisterErc20 { erc20_address: String },

    /// Flip the enabled flag of a pair
    ToggleConversion {
        /// Pair id, denom or contract address
        token: String,
    },

    /// Set the enabled flag of a pair
    SetEnabled { token: String, enabled: bool },

    /// Replace the conversion parameters
    UpdateParams { params: Params },

    // ========================================================================
    // ICS-20 Transfers
    // ========================================================================
    /// Send tokens over a transfer channel, converting any shortfall of the
    /// ledger balance from contract form first
    Transfer {
        source_port: String,
        source_channel: String,
        token: Coin,
        receiver: String,
        timeout_height: u64,
        timeout_timestamp: u64,
        #[serde(default)]
        memo: String,
    },
}

// ============================================================================
// Query Messages
// ============================================================================

/// Query messages
#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Returns the conversion parameters
    #[returns(ParamsResponse)]
    Params {},

    /// Returns the module configuration
    #[returns(ConfigResponse)]
    Config {},

    /// Returns a pair by id, denom or contract address
    #[returns(TokenPairResponse)]
    TokenPair { token: String },

    /// Returns all pairs, paginated by id
    #[returns(TokenPairsResponse)]
    TokenPairs {
        start_after: Option<String>,
        limit: Option<u32>,
    },

    /// Returns the pending transfer record of a sent packet
    #[returns(PendingTransferResponse)]
    PendingTransfer { channel: String, sequence: u64 },

    /// Returns pending transfer records, optionally only those whose packet
    /// timeout has passed without a terminal event
    #[returns(PendingTransfersResponse)]
    PendingTransfers {
        start_after: Option<(String, u64)>,
        limit: Option<u32>,
        #[serde(default)]
        expired_only: bool,
    },

    /// Returns the escrow backing of a pair
    #[returns(EscrowStatus)]
    EscrowStatus { token: String },
}

// ============================================================================
// Query Responses
// ============================================================================

#[cw_serde]
pub struct ParamsResponse {
    pub params: Params,
}

#[cw_serde]
pub struct ConfigResponse {
    pub authority: String,
    pub module_address: String,
    pub native_denom: String,
    pub exempt_addresses: Vec<String>,
}

#[cw_serde]
pub struct TokenPairResponse {
    pub token_pair: TokenPair,
}

#[cw_serde]
pub struct TokenPairsResponse {
    pub token_pairs: Vec<TokenPair>,
}

#[cw_serde]
pub struct PendingTransferResponse {
    pub pending: Option<PendingTransfer>,
}

#[cw_serde]
pub struct PendingTransfersResponse {
    pub pending: Vec<PendingTransfer>,
}
