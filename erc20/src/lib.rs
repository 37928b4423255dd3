//! Coin / ERC20 conversion module
//!
//! A single account can hold a fungible asset in two interoperable forms: a
//! native ledger balance ("coin") and a token contract balance ("ERC20").
//! This crate moves value between the two forms atomically and keeps them
//! consistent with cross-chain ICS-20 transfers.
//!
//! # Components
//! - Pair registry: denom <-> contract bindings, enablement and policy
//! - Conversion engine: coin -> ERC20 and ERC20 -> coin in one transition
//! - Transfer hooks: convert on send, reverse on error ack / timeout,
//!   force-convert on receive
//! - Contract call bridge: the fixed token ABI and revert decoding
//!
//! # Collaborators
//! The ledger, the contract engine and the transfer application are
//! reached through the traits in [`interfaces`]. They all read and write the
//! same [`cosmwasm_std::Storage`] as the module, and every entry point of
//! the [`Keeper`] runs on a cached branch of it, so a transition commits
//! completely or not at all.
//!
//! # Features
//! - `testing` - Store-backed mock ledger, contract engine and transfer
//!   application for integration tests

pub mod address;
pub mod erc20_bridge;
pub mod error;
pub mod execute;
pub mod hash;
pub mod ibc_callbacks;
pub mod interfaces;
pub mod keeper;
pub mod msg;
mod query;
pub mod state;
pub mod store;

#[cfg(feature = "testing")]
pub mod testing;

pub use crate::error::Erc20Error;
pub use crate::interfaces::{BankKeeper, CallOutcome, EvmKeeper, TransferModule};
pub use crate::keeper::{Keeper, ModuleDeps, ModuleDepsMut};
