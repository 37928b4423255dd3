//! Collaborators the module drives but does not own.
//!
//! Every method takes the store of the current transition explicitly, so the
//! ledger and the contract engine write into the same cached branch as the
//! module itself.

use alloy::primitives::{Address, Bytes, B256};
use cosmwasm_std::{Env, StdResult, Storage, Uint128};

use common::{Acknowledgement, MsgTransfer, Packet};

use crate::error::Erc20Error;

/// Ledger balance store
pub trait BankKeeper {
    fn balance(&self, store: &dyn Storage, account: &Address, denom: &str) -> StdResult<Uint128>;

    fn supply(&self, store: &dyn Storage, denom: &str) -> StdResult<Uint128>;

    /// Increase `account`'s balance and the denom supply
    fn credit(
        &self,
        store: &mut dyn Storage,
        account: &Address,
        denom: &str,
        amount: Uint128,
    ) -> StdResult<()>;

    /// Decrease `account`'s balance and the denom supply. Fails when the
    /// balance is short.
    fn debit(
        &self,
        store: &mut dyn Storage,
        account: &Address,
        denom: &str,
        amount: Uint128,
    ) -> StdResult<()>;

    /// Move coins between accounts, leaving supply unchanged
    fn send(
        &self,
        store: &mut dyn Storage,
        from: &Address,
        to: &Address,
        denom: &str,
        amount: Uint128,
    ) -> StdResult<()> {
        self.debit(store, from, denom, amount)?;
        self.credit(store, to, denom, amount)
    }
}

/// Result of executing contract code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    /// Return data, or revert data when `reverted`
    pub ret: Bytes,
    pub reverted: bool,
}

impl CallOutcome {
    pub fn success(ret: impl Into<Bytes>) -> Self {
        Self {
            ret: ret.into(),
            reverted: false,
        }
    }

    pub fn revert(data: impl Into<Bytes>) -> Self {
        Self {
            ret: data.into(),
            reverted: true,
        }
    }
}

/// Contract execution engine
pub trait EvmKeeper {
    fn has_code(&self, store: &dyn Storage, contract: &Address) -> bool;

    /// Raw storage slot of a contract
    fn storage_at(&self, store: &dyn Storage, contract: &Address, slot: B256) -> B256;

    /// Read-only call; state changes made by the code are not kept
    fn query(&self, store: &dyn Storage, contract: &Address, data: &[u8])
        -> StdResult<CallOutcome>;

    /// State-changing call from `from`. Writes are kept only when the call
    /// does not revert.
    fn call(
        &self,
        store: &mut dyn Storage,
        from: &Address,
        contract: &Address,
        data: &[u8],
    ) -> StdResult<CallOutcome>;

    /// Deploy a mintable and burnable token owned by `owner`
    fn deploy_erc20(
        &self,
        store: &mut dyn Storage,
        owner: &Address,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> StdResult<Address>;
}

/// The wrapped ICS-20 transfer application
pub trait TransferModule {
    /// Escrow or burn the tokens and send the packet, returning its sequence
    fn send_transfer(
        &self,
        store: &mut dyn Storage,
        env: &Env,
        msg: &MsgTransfer,
    ) -> Result<u64, Erc20Error>;

    /// Credit the receiver; an error acknowledgement means nothing was credited
    fn on_recv_packet(&self, store: &mut dyn Storage, env: &Env, packet: &Packet)
        -> Acknowledgement;

    /// Refund the sender when the acknowledgement is an error
    fn on_acknowledgement_packet(
        &self,
        store: &mut dyn Storage,
        env: &Env,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), Erc20Error>;

    /// Refund the sender
    fn on_timeout_packet(
        &self,
        store: &mut dyn Storage,
        env: &Env,
        packet: &Packet,
    ) -> Result<(), Erc20Error>;
}
