//! Deterministic identifiers.
//!
//! Token pair ids and module accounts are derived with sha256 so they are
//! identical on every node and across upgrades.

use alloy::primitives::Address;

pub use common::sha256;

/// Denomination prefix of coins minted for externally owned contracts
pub const ERC20_DENOM_PREFIX: &str = "erc20/";

/// Token pair id: `sha256(checksum(erc20) || denom)` as lower-case hex
pub fn token_pair_id(erc20: &Address, denom: &str) -> String {
    let mut preimage = erc20.to_checksum(None).into_bytes();
    preimage.extend_from_slice(denom.as_bytes());
    hex::encode(sha256(&preimage))
}

/// Module account address: the first 20 bytes of `sha256(name)`
pub fn module_address(name: &str) -> Address {
    let hash = sha256(name.as_bytes());
    Address::from_slice(&hash[..20])
}

/// Ledger denomination representing an externally owned contract
pub fn erc20_denom(erc20: &Address) -> String {
    format!("{}{}", ERC20_DENOM_PREFIX, erc20.to_checksum(None))
}

/// Check that a string is a well-formed token pair id
pub fn is_pair_id(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}
