//! Module keeper - entry points
//!
//! The keeper owns the three collaborators (ledger, contract engine and the
//! wrapped transfer application) and exposes the module's entry points.
//! Every state-changing entry point runs on a cached branch of the host
//! store, so a failure leaves no partial writes behind.
//!
//! - `execute/` - execute message handlers
//! - `ibc_callbacks` - ICS-20 transfer lifecycle hooks
//! - `query` - query message handlers

use alloy::primitives::Address;
use cosmwasm_std::{to_json_binary, Binary, Env, MessageInfo, Response, StdResult, Storage};
use cw2::set_contract_version;
use tracing::info;

use common::{Acknowledgement, MsgTransfer, Packet};

use crate::address::parse_account;
use crate::error::Erc20Error;
use crate::execute::{
    execute_convert_coin, execute_convert_erc20, execute_register_coin, execute_register_erc20,
    execute_set_enabled, execute_toggle_conversion, execute_update_params, validate_params,
};
use crate::hash::module_address;
use crate::ibc_callbacks::{
    execute_transfer, on_acknowledgement_packet, on_recv_packet, on_timeout_packet,
};
use crate::interfaces::{BankKeeper, EvmKeeper, TransferModule};
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::query::{
    query_config, query_escrow_status, query_params, query_pending_transfer,
    query_pending_transfers, query_token_pair, query_token_pairs,
};
use crate::state::{Config, CONFIG, CONTRACT_NAME, CONTRACT_VERSION, MODULE_NAME, PARAMS};
use crate::store;

// ============================================================================
// Dependencies
// ============================================================================

/// Mutable view of the store plus collaborators, passed to handlers
pub struct ModuleDepsMut<'a> {
    pub storage: &'a mut dyn Storage,
    pub bank: &'a dyn BankKeeper,
    pub evm: &'a dyn EvmKeeper,
    pub transfer: &'a dyn TransferModule,
}

impl<'a> ModuleDepsMut<'a> {
    pub fn branch(&'_ mut self) -> ModuleDepsMut<'_> {
        ModuleDepsMut {
            storage: self.storage,
            bank: self.bank,
            evm: self.evm,
            transfer: self.transfer,
        }
    }

    /// Run `f` on a nested cache branch, committed only on success
    pub fn transactional<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(ModuleDepsMut<'_>) -> Result<T, E>,
    {
        let (bank, evm, transfer) = (self.bank, self.evm, self.transfer);
        store::transactional(self.storage, |storage| {
            f(ModuleDepsMut {
                storage,
                bank,
                evm,
                transfer,
            })
        })
    }
}

/// Read-only view of the store plus collaborators
#[derive(Clone, Copy)]
pub struct ModuleDeps<'a> {
    pub storage: &'a dyn Storage,
    pub bank: &'a dyn BankKeeper,
    pub evm: &'a dyn EvmKeeper,
}

// ============================================================================
// Keeper
// ============================================================================

pub struct Keeper<B, E, T> {
    pub bank: B,
    pub evm: E,
    pub transfer: T,
}

impl<B, E, T> Keeper<B, E, T>
where
    B: BankKeeper,
    E: EvmKeeper,
    T: TransferModule,
{
    pub fn new(bank: B, evm: E, transfer: T) -> Self {
        Self {
            bank,
            evm,
            transfer,
        }
    }

    pub fn deps_mut<'a>(&'a self, storage: &'a mut dyn Storage) -> ModuleDepsMut<'a> {
        ModuleDepsMut {
            storage,
            bank: &self.bank,
            evm: &self.evm,
            transfer: &self.transfer,
        }
    }

    pub fn deps<'a>(&'a self, storage: &'a dyn Storage) -> ModuleDeps<'a> {
        ModuleDeps {
            storage,
            bank: &self.bank,
            evm: &self.evm,
        }
    }

    // ========================================================================
    // Instantiate & Migrate
    // ========================================================================

    pub fn instantiate(
        &self,
        storage: &mut dyn Storage,
        _env: &Env,
        msg: InstantiateMsg,
    ) -> Result<Response, Erc20Error> {
        store::transactional(storage, |storage| {
            set_contract_version(storage, CONTRACT_NAME, CONTRACT_VERSION)?;

            let authority = parse_account(&msg.authority)?;
            let module = match msg.module_address.as_deref() {
                Some(addr) => parse_account(addr)?,
                None => module_address(MODULE_NAME),
            };
            common::validate_denom(&msg.native_denom)?;
            let exempt_addresses = msg
                .exempt_addresses
                .iter()
                .map(|a| parse_account(a).map(|addr| addr.to_checksum(None)))
                .collect::<Result<Vec<_>, _>>()?;

            let params = msg.params.unwrap_or_default();
            validate_params(&params)?;

            let config = Config {
                authority: authority.to_checksum(None),
                module_address: module.to_checksum(None),
                native_denom: msg.native_denom,
                exempt_addresses,
            };
            CONFIG.save(storage, &config)?;
            PARAMS.save(storage, &params)?;

            info!(
                authority = %config.authority,
                module = %config.module_address,
                "erc20 module instantiated"
            );

            Ok(Response::new()
                .add_attribute("method", "instantiate")
                .add_attribute("authority", config.authority)
                .add_attribute("module_address", config.module_address)
                .add_attribute("enable_conversion", params.enable_conversion.to_string()))
        })
    }

    pub fn migrate(
        &self,
        storage: &mut dyn Storage,
        _env: &Env,
        _msg: MigrateMsg,
    ) -> Result<Response, Erc20Error> {
        set_contract_version(storage, CONTRACT_NAME, CONTRACT_VERSION)?;

        // Params may be missing when migrating from a build without them
        if PARAMS.may_load(storage)?.is_none() {
            PARAMS.save(storage, &Default::default())?;
        }

        Ok(Response::new()
            .add_attribute("method", "migrate")
            .add_attribute("version", CONTRACT_VERSION))
    }

    // ========================================================================
    // Execute
    // ========================================================================

    pub fn execute(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        info: &MessageInfo,
        msg: ExecuteMsg,
    ) -> Result<Response, Erc20Error> {
        let sender = parse_account(info.sender.as_str())?;
        store::transactional(storage, |storage| {
            let deps = self.deps_mut(storage);
            dispatch(deps, env, &sender, info, msg)
        })
    }

    // ========================================================================
    // ICS-20 Hooks
    // ========================================================================

    /// Outgoing transfer requested by another module on behalf of a user
    pub fn send_transfer(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        msg: MsgTransfer,
    ) -> Result<Response, Erc20Error> {
        let sender = parse_account(&msg.sender)?;
        store::transactional(storage, |storage| {
            execute_transfer(self.deps_mut(storage), env, &sender, msg)
        })
    }

    /// Inbound packet. Never fails; failures become error acknowledgements.
    pub fn on_recv_packet(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        packet: &Packet,
    ) -> Acknowledgement {
        on_recv_packet(self.deps_mut(storage), env, packet)
    }

    /// Acknowledgement of a packet we sent. An error here must halt the host.
    pub fn on_acknowledgement_packet(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<Response, Erc20Error> {
        store::transactional(storage, |storage| {
            on_acknowledgement_packet(self.deps_mut(storage), env, packet, ack)
        })
    }

    /// Timeout of a packet we sent. An error here must halt the host.
    pub fn on_timeout_packet(
        &self,
        storage: &mut dyn Storage,
        env: &Env,
        packet: &Packet,
    ) -> Result<Response, Erc20Error> {
        store::transactional(storage, |storage| {
            on_timeout_packet(self.deps_mut(storage), env, packet)
        })
    }

    // ========================================================================
    // Query
    // ========================================================================

    pub fn query(&self, storage: &dyn Storage, env: &Env, msg: QueryMsg) -> StdResult<Binary> {
        let deps = self.deps(storage);
        match msg {
            QueryMsg::Params {} => to_json_binary(&query_params(deps)?),
            QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
            QueryMsg::TokenPair { token } => to_json_binary(&query_token_pair(deps, token)?),
            QueryMsg::TokenPairs { start_after, limit } => {
                to_json_binary(&query_token_pairs(deps, start_after, limit)?)
            }
            QueryMsg::PendingTransfer { channel, sequence } => {
                to_json_binary(&query_pending_transfer(deps, channel, sequence)?)
            }
            QueryMsg::PendingTransfers {
                start_after,
                limit,
                expired_only,
            } => to_json_binary(&query_pending_transfers(
                deps,
                env,
                start_after,
                limit,
                expired_only,
            )?),
            QueryMsg::EscrowStatus { token } => {
                to_json_binary(&query_escrow_status(deps, token)?)
            }
        }
    }
}

fn dispatch(
    deps: ModuleDepsMut,
    env: &Env,
    sender: &Address,
    info: &MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, Erc20Error> {
    match msg {
        // Conversions
        ExecuteMsg::ConvertCoin { coin, receiver } => {
            execute_convert_coin(deps, sender, coin, receiver)
        }
        ExecuteMsg::ConvertErc20 {
            contract_address,
            amount,
            receiver,
        } => execute_convert_erc20(deps, sender, contract_address, amount, receiver),

        // Pair registry
        ExecuteMsg::RegisterCoin { metadata } => execute_register_coin(deps, sender, metadata),
        ExecuteMsg::RegisterErc20 { erc20_address } => {
            execute_register_erc20(deps, sender, erc20_address)
        }
        ExecuteMsg::ToggleConversion { token } => execute_toggle_conversion(deps, sender, token),
        ExecuteMsg::SetEnabled { token, enabled } => {
            execute_set_enabled(deps, sender, token, enabled)
        }
        ExecuteMsg::UpdateParams { params } => execute_update_params(deps, sender, params),

        // Transfers
        ExecuteMsg::Transfer {
            source_port,
            source_channel,
            token,
            receiver,
            timeout_height,
            timeout_timestamp,
            memo,
        } => {
            let msg = MsgTransfer {
                source_port,
                source_channel,
                token,
                sender: info.sender.to_string(),
                receiver,
                timeout_height,
                timeout_timestamp,
                memo,
            };
            execute_transfer(deps, env, sender, msg)
        }
    }
}
