//! ICS-20 fungible token transfer types.
//!
//! Packet data, acknowledgements and denomination traces as defined by the
//! ICS-20 specification. Vouchers received from another chain are named
//! `ibc/{SHA256(path/base_denom)}` with the hash in upper-case hex.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, Coin, StdError, StdResult, Uint128};
use sha2::{Digest, Sha256};

/// ICS-20 application version
pub const ICS20_VERSION: &str = "ics20-1";

/// Prefix of hashed voucher denominations
pub const IBC_DENOM_PREFIX: &str = "ibc/";

/// Compute sha256 of arbitrary data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

// ============================================================================
// Packets
// ============================================================================

/// ICS-20 packet payload
#[cw_serde]
pub struct FungibleTokenPacketData {
    /// Full denomination trace as known by the sending chain
    pub denom: String,
    /// Amount as a decimal string
    pub amount: String,
    pub sender: String,
    pub receiver: String,
    #[serde(default)]
    pub memo: String,
}

impl FungibleTokenPacketData {
    /// Parse and validate the transferred amount
    pub fn amount(&self) -> StdResult<Uint128> {
        let amount: Uint128 = self
            .amount
            .parse()
            .map_err(|_| StdError::parse_err("Uint128", format!("invalid amount {}", self.amount)))?;
        if amount.is_zero() {
            return Err(StdError::generic_err("packet amount must be positive"));
        }
        Ok(amount)
    }

    /// Basic validation performed by the transfer application
    pub fn validate(&self) -> StdResult<()> {
        self.amount()?;
        if self.denom.trim().is_empty() {
            return Err(StdError::generic_err("packet denom cannot be blank"));
        }
        if self.sender.trim().is_empty() {
            return Err(StdError::generic_err("packet sender cannot be blank"));
        }
        if self.receiver.trim().is_empty() {
            return Err(StdError::generic_err("packet receiver cannot be blank"));
        }
        Ok(())
    }
}

/// Relayed packet as delivered by the channel layer
#[cw_serde]
pub struct Packet {
    /// Sequence number assigned by the sending chain, per channel
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
    /// JSON encoded [`FungibleTokenPacketData`]
    pub data: Binary,
    /// Timeout block height on the receiving chain (0 = none)
    pub timeout_height: u64,
    /// Timeout timestamp in nanoseconds on the receiving chain (0 = none)
    pub timeout_timestamp: u64,
}

impl Packet {
    /// Decode the ICS-20 payload
    pub fn token_data(&self) -> StdResult<FungibleTokenPacketData> {
        cosmwasm_std::from_json(&self.data)
    }
}

/// ICS-20 acknowledgement, JSON encoded as `{"result": ...}` or `{"error": ...}`
#[cw_serde]
pub enum Acknowledgement {
    Result(Binary),
    Error(String),
}

impl Acknowledgement {
    /// Standard success acknowledgement (`AQ==`, a single 0x01 byte)
    pub fn success() -> Self {
        Acknowledgement::Result(Binary::from(vec![1u8]))
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Acknowledgement::Error(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Acknowledgement::Result(_))
    }
}

/// Outgoing transfer request
#[cw_serde]
pub struct MsgTransfer {
    pub source_port: String,
    pub source_channel: String,
    /// Local denomination and amount to send
    pub token: Coin,
    pub sender: String,
    /// Receiver on the counterparty chain (opaque to this chain)
    pub receiver: String,
    /// Timeout block height on the counterparty (0 = none)
    pub timeout_height: u64,
    /// Timeout timestamp in nanoseconds on the counterparty (0 = none)
    pub timeout_timestamp: u64,
    #[serde(default)]
    pub memo: String,
}

impl MsgTransfer {
    pub fn validate(&self) -> StdResult<()> {
        if self.token.amount.is_zero() {
            return Err(StdError::generic_err("transfer amount must be positive"));
        }
        if self.timeout_height == 0 && self.timeout_timestamp == 0 {
            return Err(StdError::generic_err(
                "transfer must carry a timeout height or timestamp",
            ));
        }
        if self.source_port.is_empty() || self.source_channel.is_empty() {
            return Err(StdError::generic_err("source port and channel are required"));
        }
        if self.receiver.trim().is_empty() {
            return Err(StdError::generic_err("receiver cannot be blank"));
        }
        Ok(())
    }
}

// ============================================================================
// Denomination Traces
// ============================================================================

/// Path of (port, channel) hops plus the base denomination
#[cw_serde]
pub struct DenomTrace {
    /// `port/channel` hops, outermost first (empty for a native denom)
    pub path: String,
    pub base_denom: String,
}

impl DenomTrace {
    /// Split a full denomination into its hop path and base denom.
    ///
    /// Hops are consumed while components come in `port/channel-N` pairs;
    /// everything after the last hop is the base denom, which may itself
    /// contain slashes (e.g. `erc20/0x…`).
    pub fn parse(full_denom: &str) -> Self {
        let components: Vec<&str> = full_denom.split('/').collect();
        let mut split = 0;
        while split + 2 < components.len() && is_channel_id(components[split + 1]) {
            split += 2;
        }

        DenomTrace {
            path: components[..split].join("/"),
            base_denom: components[split..].join("/"),
        }
    }

    /// `path/base_denom`, or the base denom alone for native tokens
    pub fn full_path(&self) -> String {
        if self.path.is_empty() {
            self.base_denom.clone()
        } else {
            format!("{}/{}", self.path, self.base_denom)
        }
    }

    pub fn hash(&self) -> [u8; 32] {
        sha256(self.full_path().as_bytes())
    }

    /// Local denomination: `ibc/{HASH}` for vouchers, the base denom otherwise
    pub fn ibc_denom(&self) -> String {
        if self.path.is_empty() {
            return self.base_denom.clone();
        }
        format!("{}{}", IBC_DENOM_PREFIX, hex::encode_upper(self.hash()))
    }
}

fn is_channel_id(component: &str) -> bool {
    component
        .strip_prefix("channel-")
        .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// `port/channel/` prefix a hop adds to a denomination
pub fn denom_prefix(port: &str, channel: &str) -> String {
    format!("{}/{}/", port, channel)
}

/// True when the token originally came from the receiving chain, i.e. the
/// sending chain prefixed it with our (source) port and channel.
pub fn receiver_chain_is_source(source_port: &str, source_channel: &str, denom: &str) -> bool {
    denom.starts_with(&denom_prefix(source_port, source_channel))
}

/// True when the sending chain is the token's source and will escrow it
pub fn sender_chain_is_source(source_port: &str, source_channel: &str, denom: &str) -> bool {
    !receiver_chain_is_source(source_port, source_channel, denom)
}

/// Denomination credited on the receiving chain for an inbound packet.
///
/// Returning tokens are unwrapped by one hop; foreign tokens gain a hop for
/// the destination port and channel and become an `ibc/` voucher.
pub fn received_denom(packet: &Packet, data: &FungibleTokenPacketData) -> String {
    let source_prefix = denom_prefix(&packet.source_port, &packet.source_channel);
    match data.denom.strip_prefix(&source_prefix) {
        Some(unprefixed) => DenomTrace::parse(unprefixed).ibc_denom(),
        None => {
            let prefixed = format!(
                "{}{}",
                denom_prefix(&packet.destination_port, &packet.destination_channel),
                data.denom
            );
            DenomTrace::parse(&prefixed).ibc_denom()
        }
    }
}

/// Escrow account of a transfer channel: `sha256("ics20-1\0port/channel")[..20]`
pub fn escrow_address(port: &str, channel: &str) -> [u8; 20] {
    let mut preimage = Vec::with_capacity(ICS20_VERSION.len() + 1 + port.len() + channel.len() + 1);
    preimage.extend_from_slice(ICS20_VERSION.as_bytes());
    preimage.push(0);
    preimage.extend_from_slice(format!("{}/{}", port, channel).as_bytes());

    let hash = sha256(&preimage);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[..20]);
    address
}
