//! Store-backed ICS-20 transfer application.
//!
//! Implements the token movements of the transfer application on top of
//! [`MockBank`]: native tokens are escrowed in the channel escrow account on
//! send and released on receipt; vouchers are burned on send and minted on
//! receipt. Refunds on error acknowledgements and timeouts undo the send.

use std::cell::RefCell;

use alloy::primitives::Address;
use cosmwasm_std::{to_json_binary, Env, StdResult, Storage, Uint128};
use cw_storage_plus::Map;

use common::{
    escrow_address, received_denom, receiver_chain_is_source, sender_chain_is_source,
    Acknowledgement, DenomTrace, FungibleTokenPacketData, MsgTransfer, Packet,
};

use crate::address::parse_account;
use crate::error::Erc20Error;
use crate::interfaces::{BankKeeper, TransferModule};
use crate::testing::bank::MockBank;

/// Counterparty (port, channel) of each open local channel
const CHANNELS: Map<&str, (String, String)> = Map::new("mock_transfer_channels");

const NEXT_SEQUENCE: Map<&str, u64> = Map::new("mock_transfer_next_sequence");

/// Packets sent, keyed by (source channel, sequence)
const SENT_PACKETS: Map<(&str, u64), Packet> = Map::new("mock_transfer_sent_packets");

/// Voucher denominations created on receipt
const DENOM_TRACES: Map<&str, DenomTrace> = Map::new("mock_transfer_denom_traces");

pub const TRANSFER_PORT: &str = "transfer";

#[derive(Default)]
pub struct MockTransfer {
    bank: MockBank,
    /// When set, the next `on_recv_packet` acknowledges with this error
    fail_next_recv: RefCell<Option<String>>,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_channel(
        &self,
        store: &mut dyn Storage,
        channel: &str,
        counterparty_channel: &str,
    ) -> StdResult<()> {
        CHANNELS.save(
            store,
            channel,
            &(TRANSFER_PORT.to_string(), counterparty_channel.to_string()),
        )
    }

    pub fn fail_next_recv(&self, reason: &str) {
        *self.fail_next_recv.borrow_mut() = Some(reason.to_string());
    }

    pub fn sent_packet(&self, store: &dyn Storage, channel: &str, sequence: u64) -> StdResult<Packet> {
        SENT_PACKETS.load(store, (channel, sequence))
    }

    /// Escrow account of a local channel
    pub fn escrow(&self, channel: &str) -> Address {
        Address::from(escrow_address(TRANSFER_PORT, channel))
    }

    /// Build the packet a counterparty would relay to `channel`
    pub fn incoming_packet(
        &self,
        store: &dyn Storage,
        channel: &str,
        sequence: u64,
        data: &FungibleTokenPacketData,
    ) -> StdResult<Packet> {
        let (port, counterparty) = CHANNELS.load(store, channel)?;
        Ok(Packet {
            sequence,
            source_port: port,
            source_channel: counterparty,
            destination_port: TRANSFER_PORT.to_string(),
            destination_channel: channel.to_string(),
            data: to_json_binary(data)?,
            timeout_height: 0,
            timeout_timestamp: u64::MAX,
        })
    }

    /// Full ICS-20 path of a local denomination
    fn full_path(&self, store: &dyn Storage, denom: &str) -> StdResult<String> {
        match DENOM_TRACES.may_load(store, denom)? {
            Some(trace) => Ok(trace.full_path()),
            None => Ok(denom.to_string()),
        }
    }

    fn refund(&self, store: &mut dyn Storage, packet: &Packet) -> Result<(), Erc20Error> {
        let data = packet.token_data()?;
        let sender = parse_account(&data.sender)?;
        let amount = data.amount()?;
        let denom = DenomTrace::parse(&data.denom).ibc_denom();

        if sender_chain_is_source(&packet.source_port, &packet.source_channel, &data.denom) {
            let escrow = self.escrow(&packet.source_channel);
            self.bank.send(store, &escrow, &sender, &denom, amount)?;
        } else {
            self.bank.credit(store, &sender, &denom, amount)?;
        }
        Ok(())
    }

    fn receive(&self, store: &mut dyn Storage, packet: &Packet) -> Result<(), Erc20Error> {
        let data = packet.token_data()?;
        let receiver = parse_account(&data.receiver)?;
        let amount: Uint128 = data.amount()?;
        let denom = received_denom(packet, &data);

        if receiver_chain_is_source(&packet.source_port, &packet.source_channel, &data.denom) {
            let escrow = self.escrow(&packet.destination_channel);
            self.bank.send(store, &escrow, &receiver, &denom, amount)?;
        } else {
            let prefixed = format!(
                "{}/{}/{}",
                packet.destination_port, packet.destination_channel, data.denom
            );
            let trace = DenomTrace::parse(&prefixed);
            DENOM_TRACES.save(store, &denom, &trace)?;
            self.bank.credit(store, &receiver, &denom, amount)?;
        }
        Ok(())
    }
}

impl TransferModule for MockTransfer {
    fn send_transfer(
        &self,
        store: &mut dyn Storage,
        _env: &Env,
        msg: &MsgTransfer,
    ) -> Result<u64, Erc20Error> {
        let (port, counterparty) = CHANNELS
            .may_load(store, &msg.source_channel)?
            .ok_or_else(|| Erc20Error::TransferFailed {
                reason: format!("channel {} is not open", msg.source_channel),
            })?;
        let sender = parse_account(&msg.sender)?;
        let full_path = self.full_path(store, &msg.token.denom)?;

        if sender_chain_is_source(&msg.source_port, &msg.source_channel, &full_path) {
            let escrow = self.escrow(&msg.source_channel);
            self.bank
                .send(store, &sender, &escrow, &msg.token.denom, msg.token.amount)
                .map_err(|e| Erc20Error::TransferFailed {
                    reason: e.to_string(),
                })?;
        } else {
            self.bank
                .debit(store, &sender, &msg.token.denom, msg.token.amount)
                .map_err(|e| Erc20Error::TransferFailed {
                    reason: e.to_string(),
                })?;
        }

        let sequence = NEXT_SEQUENCE
            .may_load(store, &msg.source_channel)?
            .unwrap_or(1);
        NEXT_SEQUENCE.save(store, &msg.source_channel, &(sequence + 1))?;

        let data = FungibleTokenPacketData {
            denom: full_path,
            amount: msg.token.amount.to_string(),
            sender: msg.sender.clone(),
            receiver: msg.receiver.clone(),
            memo: msg.memo.clone(),
        };
        let packet = Packet {
            sequence,
            source_port: msg.source_port.clone(),
            source_channel: msg.source_channel.clone(),
            destination_port: port,
            destination_channel: counterparty,
            data: to_json_binary(&data)?,
            timeout_height: msg.timeout_height,
            timeout_timestamp: msg.timeout_timestamp,
        };
        SENT_PACKETS.save(store, (msg.source_channel.as_str(), sequence), &packet)?;

        Ok(sequence)
    }

    fn on_recv_packet(
        &self,
        store: &mut dyn Storage,
        _env: &Env,
        packet: &Packet,
    ) -> Acknowledgement {
        if let Some(reason) = self.fail_next_recv.borrow_mut().take() {
            return Acknowledgement::error(reason);
        }
        match self.receive(store, packet) {
            Ok(()) => Acknowledgement::success(),
            Err(err) => Acknowledgement::error(err.to_string()),
        }
    }

    fn on_acknowledgement_packet(
        &self,
        store: &mut dyn Storage,
        _env: &Env,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), Erc20Error> {
        if ack.is_success() {
            return Ok(());
        }
        self.refund(store, packet)
    }

    fn on_timeout_packet(
        &self,
        store: &mut dyn Storage,
        _env: &Env,
        packet: &Packet,
    ) -> Result<(), Erc20Error> {
        self.refund(store, packet)
    }
}
