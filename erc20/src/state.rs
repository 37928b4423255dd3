//! State definitions for the erc20 conversion module
//!
//! This module defines the token pair registry, the conversion parameters,
//! module configuration and the pending transfer records written by the
//! ICS-20 send hook.

use std::str::FromStr;

use alloy::primitives::Address;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint128;
use cw_storage_plus::{Index, IndexList, IndexedMap, Item, Map, UniqueIndex};

use crate::error::Erc20Error;

// ============================================================================
// Token Pairs
// ============================================================================

/// Which side of a pair is the native representation
#[cw_serde]
pub enum ContractOwner {
    /// The coin is native; the module deployed the contract and holds its
    /// mint and burn authority. Ledger coins are escrowed by the module.
    Module,
    /// The contract is native; converted coins are `erc20/0x…` vouchers
    /// backed by contract tokens locked in the module account.
    External,
}

/// Binding between a ledger denomination and a token contract
#[cw_serde]
pub struct TokenPair {
    /// `sha256(checksum(erc20_address) || denom)`, hex encoded
    pub id: String,
    /// EIP-55 checksum address of the token contract
    pub erc20_address: String,
    pub denom: String,
    pub enabled: bool,
    pub contract_owner: ContractOwner,
    /// Exponent of the ledger base unit relative to the display unit
    pub coin_exponent: u32,
    /// Decimals declared by the token contract
    pub erc20_decimals: u8,
}

impl TokenPair {
    pub fn new(
        erc20: &Address,
        denom: impl Into<String>,
        contract_owner: ContractOwner,
        coin_exponent: u32,
        erc20_decimals: u8,
    ) -> Self {
        let denom = denom.into();
        Self {
            id: crate::hash::token_pair_id(erc20, &denom),
            erc20_address: erc20.to_checksum(None),
            denom,
            enabled: true,
            contract_owner,
            coin_exponent,
            erc20_decimals,
        }
    }

    /// Parsed contract address
    pub fn erc20(&self) -> Result<Address, Erc20Error> {
        Address::from_str(&self.erc20_address).map_err(|e| Erc20Error::InvalidAddress {
            reason: format!("stored pair address {}: {}", self.erc20_address, e),
        })
    }

    /// Power of ten separating the two unit systems
    fn scale(&self) -> Result<Uint128, Erc20Error> {
        let k = self.coin_exponent.abs_diff(self.erc20_decimals as u32);
        Ok(Uint128::new(10).checked_pow(k)?)
    }

    /// Ledger units to contract units. Fails rather than drop a remainder.
    pub fn coin_to_erc20(&self, amount: Uint128) -> Result<Uint128, Erc20Error> {
        let factor = self.scale()?;
        if self.coin_exponent >= self.erc20_decimals as u32 {
            exact_div(amount, factor)
        } else {
            Ok(amount.checked_mul(factor)?)
        }
    }

    /// Contract units to ledger units. Fails rather than drop a remainder.
    pub fn erc20_to_coin(&self, amount: Uint128) -> Result<Uint128, Erc20Error> {
        let factor = self.scale()?;
        if self.coin_exponent >= self.erc20_decimals as u32 {
            Ok(amount.checked_mul(factor)?)
        } else {
            exact_div(amount, factor)
        }
    }
}

fn exact_div(amount: Uint128, unit: Uint128) -> Result<Uint128, Erc20Error> {
    if !(amount % unit).is_zero() {
        return Err(Erc20Error::PrecisionLoss { amount, unit });
    }
    Ok(amount / unit)
}

pub struct TokenPairIndexes<'a> {
    pub denom: UniqueIndex<'a, String, TokenPair, &'a str>,
    pub erc20: UniqueIndex<'a, String, TokenPair, &'a str>,
}

impl<'a> IndexList<TokenPair> for TokenPairIndexes<'a> {
    fn get_indexes(&'_ self) -> Box<dyn Iterator<Item = &'_ dyn Index<TokenPair>> + '_> {
        let v: Vec<&dyn Index<TokenPair>> = vec![&self.denom, &self.erc20];
        Box::new(v.into_iter())
    }
}

/// Token pairs by id, uniquely indexed by denom and by contract address
pub fn token_pairs<'a>() -> IndexedMap<'a, &'a str, TokenPair, TokenPairIndexes<'a>> {
    let indexes = TokenPairIndexes {
        denom: UniqueIndex::new(|pair: &TokenPair| pair.denom.clone(), "token_pairs__denom"),
        erc20: UniqueIndex::new(
            |pair: &TokenPair| pair.erc20_address.clone(),
            "token_pairs__erc20",
        ),
    };
    IndexedMap::new("token_pairs", indexes)
}

// ============================================================================
// Parameters & Configuration
// ============================================================================

/// Conversion parameters, loaded at the start of every operation
#[cw_serde]
pub struct Params {
    /// Global switch for user, hook and forced conversions
    pub enable_conversion: bool,
    /// When non-empty, only these pair ids may convert
    #[serde(default)]
    pub enabled_pair_ids: Vec<String>,
    /// Pair ids that may never convert; wins over `enabled_pair_ids`
    #[serde(default)]
    pub disabled_pair_ids: Vec<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            enable_conversion: true,
            enabled_pair_ids: vec![],
            disabled_pair_ids: vec![],
        }
    }
}

impl Params {
    /// Whether the pair policy lists allow this pair
    pub fn allows_pair(&self, pair_id: &str) -> bool {
        if self.disabled_pair_ids.iter().any(|id| id == pair_id) {
            return false;
        }
        self.enabled_pair_ids.is_empty() || self.enabled_pair_ids.iter().any(|id| id == pair_id)
    }

    /// Active = globally enabled, pair enabled and allowed by policy
    pub fn is_pair_active(&self, pair: &TokenPair) -> bool {
        self.enable_conversion && pair.enabled && self.allows_pair(&pair.id)
    }
}

/// Module configuration, written once at instantiation
#[cw_serde]
pub struct Config {
    /// Governance account allowed to manage pairs and params (checksum hex)
    pub authority: String,
    /// Escrow account of the module (checksum hex)
    pub module_address: String,
    /// Staking denomination, never force-converted on receipt
    pub native_denom: String,
    /// Receivers exempt from forced conversion (checksum hex). The module
    /// escrow and the escrow of the channel a packet arrives on are always
    /// exempt; escrows of other channels must be listed here.
    pub exempt_addresses: Vec<String>,
}

impl Config {
    pub fn module(&self) -> Result<Address, Erc20Error> {
        Address::from_str(&self.module_address).map_err(|e| Erc20Error::InvalidAddress {
            reason: format!("module address {}: {}", self.module_address, e),
        })
    }

    pub fn is_exempt(&self, account: &Address) -> bool {
        let checksum = account.to_checksum(None);
        checksum == self.module_address || self.exempt_addresses.contains(&checksum)
    }
}

// ============================================================================
// Pending Transfers
// ============================================================================

/// Conversion performed by the send hook, awaiting the packet outcome
#[cw_serde]
pub struct PendingTransfer {
    pub channel: String,
    pub sequence: u64,
    pub pair_id: String,
    /// Account whose contract balance was converted (checksum hex)
    pub holder: String,
    /// Ledger units converted from contract form
    pub amount: Uint128,
    pub denom: String,
    pub timeout_height: u64,
    pub timeout_timestamp: u64,
    pub created_height: u64,
}

impl PendingTransfer {
    /// True once the packet can no longer be delivered
    pub fn is_expired(&self, height: u64, time_nanos: u64) -> bool {
        (self.timeout_height != 0 && height >= self.timeout_height)
            || (self.timeout_timestamp != 0 && time_nanos >= self.timeout_timestamp)
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Contract name for cw2 migration info
pub const CONTRACT_NAME: &str = "crates.io:erc20";

/// Contract version for cw2 migration info
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name the module account is derived from
pub const MODULE_NAME: &str = "erc20";

/// Largest display exponent a registered coin may declare
pub const MAX_COIN_EXPONENT: u32 = 36;

/// Decimals of contracts deployed for native coins are capped here
pub const MAX_ERC20_DECIMALS: u8 = 18;

// ============================================================================
// Core State Storage
// ============================================================================

pub const PARAMS: Item<Params> = Item::new("params");

pub const CONFIG: Item<Config> = Item::new("config");

/// Pending records keyed by (source channel, packet sequence)
pub const PENDING_TRANSFERS: Map<(&str, u64), PendingTransfer> = Map::new("pending_transfers");
