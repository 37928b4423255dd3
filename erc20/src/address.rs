//! Account address codec.
//!
//! Accounts are 20-byte addresses shared by the ledger and the contract
//! engine. Callers may present them either as `0x`-prefixed hex (contract
//! side) or as bech32 with any human readable prefix (ledger side); both
//! decode to the same [`Address`].

use alloy::primitives::Address;
use bech32::{FromBase32, ToBase32, Variant};

use crate::error::Erc20Error;

/// Parse an account given as hex or bech32
pub fn parse_account(account: &str) -> Result<Address, Erc20Error> {
    let account = account.trim();
    if account.starts_with("0x") || account.starts_with("0X") {
        parse_hex_address(account)
    } else {
        decode_bech32_address(account)
    }
}

/// Parse a `0x`-prefixed hex address
pub fn parse_hex_address(addr: &str) -> Result<Address, Erc20Error> {
    let hex_str = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);

    if hex_str.len() != 40 {
        return Err(Erc20Error::InvalidAddress {
            reason: format!("expected 40 hex chars, got {} in {}", hex_str.len(), addr),
        });
    }

    let bytes = hex::decode(hex_str).map_err(|e| Erc20Error::InvalidAddress {
        reason: format!("invalid hex in {}: {}", addr, e),
    })?;
    Ok(Address::from_slice(&bytes))
}

/// Decode a bech32 account (any prefix) into its 20 raw bytes
pub fn decode_bech32_address(addr: &str) -> Result<Address, Erc20Error> {
    let (_hrp, data, _variant) = bech32::decode(addr).map_err(|e| Erc20Error::InvalidAddress {
        reason: format!("invalid bech32 address {}: {}", addr, e),
    })?;

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| Erc20Error::InvalidAddress {
        reason: format!("invalid base32 data in {}: {}", addr, e),
    })?;

    if bytes.len() != 20 {
        return Err(Erc20Error::InvalidAddress {
            reason: format!("expected 20 address bytes, got {}", bytes.len()),
        });
    }

    Ok(Address::from_slice(&bytes))
}

/// Encode an account as bech32 with the given prefix
pub fn encode_bech32_address(address: &Address, hrp: &str) -> Result<String, Erc20Error> {
    bech32::encode(hrp, address.as_slice().to_base32(), Variant::Bech32).map_err(|e| {
        Erc20Error::InvalidAddress {
            reason: format!("failed to encode bech32 with prefix {}: {}", hrp, e),
        }
    })
}
