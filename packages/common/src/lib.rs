//! Common - Shared Types and Utilities for the erc20 conversion module
//!
//! This package provides the bank denomination metadata and the ICS-20
//! fungible token transfer types shared by the module and its collaborators.

pub mod denom;
pub mod ics20;

pub use denom::{validate_denom, DenomUnit, Metadata};
pub use ics20::{
    escrow_address, received_denom, receiver_chain_is_source, sender_chain_is_source, sha256,
    Acknowledgement, DenomTrace, FungibleTokenPacketData, MsgTransfer, Packet,
};
