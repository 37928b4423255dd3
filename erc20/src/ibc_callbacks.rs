//! ICS-20 transfer lifecycle hooks.
//!
//! Wraps the transfer application so both representations of a pair stay
//! consistent across asynchronous packet outcomes:
//!
//! - send: a shortfall of the ledger balance is converted from contract form
//!   before the packet leaves, and remembered as a [`PendingTransfer`]
//! - acknowledgement error / timeout: the remembered conversion is reversed
//!   after the transfer application refunded the sender
//! - receive: coins of an active pair are converted into contract form for
//!   the receiver; on any failure the receiver keeps the ledger coins

use alloy::primitives::Address;
use cosmwasm_std::{Env, Event, Response, Uint128};
use tracing::{debug, error, warn};

use common::{escrow_address, received_denom, Acknowledgement, MsgTransfer, Packet};

use crate::address::parse_account;
use crate::error::Erc20Error;
use crate::execute::{convert_coin, convert_erc20, ensure_active, find_by_denom, lookup_by_id};
use crate::keeper::ModuleDepsMut;
use crate::state::{PendingTransfer, CONFIG, PARAMS, PENDING_TRANSFERS};

// ============================================================================
// Send
// ============================================================================

/// Send tokens over a transfer channel on behalf of `sender`.
pub fn execute_transfer(
    mut deps: ModuleDepsMut,
    env: &Env,
    sender: &Address,
    msg: MsgTransfer,
) -> Result<Response, Erc20Error> {
    msg.validate()?;
    let denom = msg.token.denom.clone();
    let amount = msg.token.amount;

    let mut converted: Option<(String, Uint128)> = None;
    if let Some(pair) = find_by_denom(deps.storage, &denom)? {
        let balance = deps.bank.balance(deps.storage, sender, &denom)?;
        if balance < amount {
            // The transfer can only succeed by converting the shortfall
            let params = PARAMS.load(deps.storage)?;
            ensure_active(&params, &pair)?;

            let shortfall = amount - balance;
            let erc20_amount = pair.coin_to_erc20(shortfall)?;
            let conversion = convert_erc20(deps.branch(), &pair, sender, sender, erc20_amount)?;
            converted = Some((pair.id.clone(), conversion.coin_amount));
        }
    }

    let sequence = deps.transfer.send_transfer(deps.storage, env, &msg)?;

    let mut res = Response::new()
        .add_attribute("method", "transfer")
        .add_attribute("source_channel", &msg.source_channel)
        .add_attribute("sequence", sequence.to_string())
        .add_attribute("denom", &denom)
        .add_attribute("amount", amount.to_string());

    if let Some((pair_id, shortfall)) = converted {
        let record = PendingTransfer {
            channel: msg.source_channel.clone(),
            sequence,
            pair_id,
            holder: sender.to_checksum(None),
            amount: shortfall,
            denom: denom.clone(),
            timeout_height: msg.timeout_height,
            timeout_timestamp: msg.timeout_timestamp,
            created_height: env.block.height,
        };
        PENDING_TRANSFERS.save(deps.storage, (msg.source_channel.as_str(), sequence), &record)?;

        debug!(
            channel = %record.channel,
            sequence,
            holder = %record.holder,
            amount = %record.amount,
            "converted transfer shortfall from erc20"
        );

        res = res.add_event(
            Event::new("ibc_transfer_conversion")
                .add_attribute("pair_id", &record.pair_id)
                .add_attribute("sender", &record.holder)
                .add_attribute("amount", record.amount.to_string())
                .add_attribute("denom", &record.denom)
                .add_attribute("source_channel", &record.channel)
                .add_attribute("sequence", sequence.to_string()),
        );
    }

    Ok(res)
}

// ============================================================================
// Acknowledgement & Timeout
// ============================================================================

/// Handle the acknowledgement of a packet sent from this chain.
pub fn on_acknowledgement_packet(
    mut deps: ModuleDepsMut,
    env: &Env,
    packet: &Packet,
    ack: &Acknowledgement,
) -> Result<Response, Erc20Error> {
    deps.transfer
        .on_acknowledgement_packet(deps.storage, env, packet, ack)?;

    if ack.is_success() {
        let key = (packet.source_channel.as_str(), packet.sequence);
        let had_record = PENDING_TRANSFERS.has(deps.storage, key);
        PENDING_TRANSFERS.remove(deps.storage, key);
        return Ok(Response::new()
            .add_attribute("method", "acknowledgement")
            .add_attribute("success", "true")
            .add_attribute("pending_discarded", had_record.to_string()));
    }

    let res = reconcile(deps.branch(), packet)?;
    Ok(res
        .add_attribute("method", "acknowledgement")
        .add_attribute("success", "false"))
}

/// Handle the timeout of a packet sent from this chain.
pub fn on_timeout_packet(
    mut deps: ModuleDepsMut,
    env: &Env,
    packet: &Packet,
) -> Result<Response, Erc20Error> {
    deps.transfer.on_timeout_packet(deps.storage, env, packet)?;

    let res = reconcile(deps.branch(), packet)?;
    Ok(res.add_attribute("method", "timeout"))
}

/// Consume the pending record of a failed packet and convert the refunded
/// coins back into contract form. Enablement gates do not apply here.
fn reconcile(mut deps: ModuleDepsMut, packet: &Packet) -> Result<Response, Erc20Error> {
    let key = (packet.source_channel.as_str(), packet.sequence);
    let Some(record) = PENDING_TRANSFERS.may_load(deps.storage, key)? else {
        return Ok(Response::new().add_attribute("reversed", "false"));
    };
    PENDING_TRANSFERS.remove(deps.storage, key);

    match reverse(deps.branch(), &record) {
        Ok(()) => {
            debug!(
                channel = %record.channel,
                sequence = record.sequence,
                holder = %record.holder,
                amount = %record.amount,
                "reversed transfer conversion"
            );
            Ok(Response::new()
                .add_attribute("reversed", "true")
                .add_event(
                    Event::new("ibc_transfer_reversal")
                        .add_attribute("pair_id", &record.pair_id)
                        .add_attribute("holder", &record.holder)
                        .add_attribute("amount", record.amount.to_string())
                        .add_attribute("denom", &record.denom)
                        .add_attribute("source_channel", &record.channel)
                        .add_attribute("sequence", record.sequence.to_string()),
                ))
        }
        Err(err) => {
            error!(
                channel = %record.channel,
                sequence = record.sequence,
                holder = %record.holder,
                amount = %record.amount,
                error = %err,
                "failed to reverse transfer conversion"
            );
            Err(Erc20Error::ReversalFailed {
                channel: record.channel,
                sequence: record.sequence,
                reason: err.to_string(),
            })
        }
    }
}

fn reverse(deps: ModuleDepsMut, record: &PendingTransfer) -> Result<(), Erc20Error> {
    let pair = lookup_by_id(deps.storage, &record.pair_id)?;
    let holder = parse_account(&record.holder)?;
    convert_coin(deps, &pair, &holder, &holder, record.amount)?;
    Ok(())
}

// ============================================================================
// Receive
// ============================================================================

/// Handle an inbound packet. The transfer application credits the receiver
/// first; its acknowledgement is returned unchanged.
pub fn on_recv_packet(mut deps: ModuleDepsMut, env: &Env, packet: &Packet) -> Acknowledgement {
    let ack = deps.transactional(|deps| {
        let ack = deps.transfer.on_recv_packet(deps.storage, env, packet);
        if ack.is_success() {
            Ok(ack)
        } else {
            Err(ack)
        }
    });
    let ack = match ack {
        Ok(ack) => ack,
        Err(ack) => return ack,
    };

    match deps.transactional(|deps| convert_received(deps, packet)) {
        Ok(Some(amount)) => {
            debug!(
                channel = %packet.destination_channel,
                sequence = packet.sequence,
                amount = %amount,
                "converted received coins to erc20"
            );
        }
        Ok(None) => {}
        Err(err) => {
            warn!(
                channel = %packet.destination_channel,
                sequence = packet.sequence,
                error = %err,
                "forced conversion failed, receiver keeps ledger coins"
            );
        }
    }

    ack
}

/// Convert freshly received coins into contract form. `Ok(None)` means the
/// packet is not eligible.
fn convert_received(deps: ModuleDepsMut, packet: &Packet) -> Result<Option<Uint128>, Erc20Error> {
    let params = PARAMS.load(deps.storage)?;
    if !params.enable_conversion {
        return Ok(None);
    }

    let data = packet.token_data().map_err(|e| Erc20Error::InvalidPacket {
        reason: e.to_string(),
    })?;
    let receiver = match parse_account(&data.receiver) {
        Ok(receiver) => receiver,
        Err(_) => return Ok(None),
    };

    // The destination channel escrow backs vouchers on the counterparty
    let channel_escrow = Address::from(escrow_address(
        &packet.destination_port,
        &packet.destination_channel,
    ));
    let config = CONFIG.load(deps.storage)?;
    if receiver == channel_escrow || config.is_exempt(&receiver) {
        return Ok(None);
    }

    let denom = received_denom(packet, &data);
    if denom == config.native_denom {
        return Ok(None);
    }

    let Some(pair) = find_by_denom(deps.storage, &denom)? else {
        return Ok(None);
    };
    if !params.is_pair_active(&pair) {
        return Ok(None);
    }

    let amount = data.amount()?;
    let conversion = convert_coin(deps, &pair, &receiver, &receiver, amount)?;
    Ok(Some(conversion.coin_amount))
}
