//! In-memory collaborators and a ready-made test environment.
//!
//! The mocks keep all of their state in the [`Storage`] handed to them, so
//! they take part in the module's cached branches exactly like the real
//! ledger and contract engine do.

pub mod bank;
pub mod evm;
pub mod transfer;

pub use bank::MockBank;
pub use evm::{Fault, MockEvm};
pub use transfer::{MockTransfer, TRANSFER_PORT};

use alloy::primitives::Address;
use cosmwasm_std::testing::{mock_env, MockStorage};
use cosmwasm_std::{from_json, Addr, Coin, Env, MessageInfo, Response, StdResult, Uint128};
use serde::de::DeserializeOwned;

use common::{Acknowledgement, DenomUnit, FungibleTokenPacketData, Metadata, Packet};

use crate::error::Erc20Error;
use crate::hash::module_address;
use crate::keeper::Keeper;
use crate::msg::{ExecuteMsg, InstantiateMsg, QueryMsg, TokenPairResponse};
use crate::state::{Params, TokenPair, MODULE_NAME};

pub const NATIVE_DENOM: &str = "ushido";
/// Local end of the test transfer channel
pub const CHANNEL: &str = "channel-0";
/// Counterparty end of the test transfer channel
pub const COUNTERPARTY_CHANNEL: &str = "channel-7";

pub type MockKeeper = Keeper<MockBank, MockEvm, MockTransfer>;

pub struct TestEnv {
    pub storage: MockStorage,
    pub keeper: MockKeeper,
    pub env: Env,
    pub authority: Address,
    pub module: Address,
    pub user: Address,
}

/// Instantiated module with one open transfer channel and default params
pub fn setup() -> TestEnv {
    setup_with(vec![], None)
}

pub fn setup_with(exempt_addresses: Vec<Address>, params: Option<Params>) -> TestEnv {
    let mut storage = MockStorage::new();
    let keeper = Keeper::new(MockBank, MockEvm::new(), MockTransfer::new());
    let env = mock_env();
    let authority = Address::repeat_byte(0xaa);
    let user = Address::repeat_byte(0x11);

    keeper
        .instantiate(
            &mut storage,
            &env,
            InstantiateMsg {
                authority: authority.to_checksum(None),
                module_address: None,
                native_denom: NATIVE_DENOM.to_string(),
                exempt_addresses: exempt_addresses
                    .iter()
                    .map(|a| a.to_checksum(None))
                    .collect(),
                params,
            },
        )
        .unwrap();
    keeper
        .transfer
        .open_channel(&mut storage, CHANNEL, COUNTERPARTY_CHANNEL)
        .unwrap();

    TestEnv {
        storage,
        keeper,
        env,
        authority,
        module: module_address(MODULE_NAME),
        user,
    }
}

/// Message info for a hex account
pub fn info(sender: &Address) -> MessageInfo {
    MessageInfo {
        sender: Addr::unchecked(sender.to_checksum(None)),
        funds: vec![],
    }
}

/// Bank metadata with a base unit and one display unit
pub fn coin_metadata(base: &str, display: &str, exponent: u32) -> Metadata {
    Metadata {
        description: format!("{} coin", display),
        denom_units: vec![
            DenomUnit {
                denom: base.to_string(),
                exponent: 0,
                aliases: vec![],
            },
            DenomUnit {
                denom: display.to_string(),
                exponent,
                aliases: vec![],
            },
        ],
        base: base.to_string(),
        display: display.to_string(),
        name: display.to_uppercase(),
        symbol: display.to_uppercase(),
    }
}

impl TestEnv {
    pub fn execute(&mut self, sender: &Address, msg: ExecuteMsg) -> Result<Response, Erc20Error> {
        self.keeper
            .execute(&mut self.storage, &self.env, &info(sender), msg)
    }

    pub fn query<T: DeserializeOwned>(&self, msg: QueryMsg) -> StdResult<T> {
        from_json(self.keeper.query(&self.storage, &self.env, msg)?)
    }

    pub fn token_pair(&self, token: impl Into<String>) -> TokenPair {
        let res: TokenPairResponse = self
            .query(QueryMsg::TokenPair {
                token: token.into(),
            })
            .unwrap();
        res.token_pair
    }

    // ========================================================================
    // Balances
    // ========================================================================

    pub fn fund(&mut self, account: &Address, amount: u128, denom: &str) {
        self.keeper
            .bank
            .fund(&mut self.storage, account, &Coin::new(amount, denom))
            .unwrap();
    }

    pub fn balance(&self, account: &Address, denom: &str) -> Uint128 {
        use crate::interfaces::BankKeeper;
        self.keeper
            .bank
            .balance(&self.storage, account, denom)
            .unwrap()
    }

    pub fn supply(&self, denom: &str) -> Uint128 {
        use crate::interfaces::BankKeeper;
        self.keeper.bank.supply(&self.storage, denom).unwrap()
    }

    pub fn erc20_balance(&self, pair: &TokenPair, account: &Address) -> Uint128 {
        self.keeper
            .evm
            .balance(&self.storage, &pair.erc20().unwrap(), account)
    }

    pub fn erc20_supply(&self, pair: &TokenPair) -> Uint128 {
        self.keeper
            .evm
            .total_supply(&self.storage, &pair.erc20().unwrap())
    }

    // ========================================================================
    // Pairs
    // ========================================================================

    /// Register a `u`-prefixed coin (`uatom`, `u/osmo`) after minting
    /// `supply` of it to the user
    pub fn register_coin(&mut self, base: &str, exponent: u32, supply: u128) -> TokenPair {
        let display = base
            .strip_prefix('u')
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(base)
            .to_string();
        self.register_metadata(coin_metadata(base, &display, exponent), supply)
    }

    pub fn register_metadata(&mut self, metadata: Metadata, supply: u128) -> TokenPair {
        let (user, authority) = (self.user, self.authority);
        let base = metadata.base.clone();
        if supply > 0 {
            self.fund(&user, supply, &base);
        }
        self.execute(&authority, ExecuteMsg::RegisterCoin { metadata })
            .unwrap();
        self.token_pair(base)
    }

    /// Deploy an externally owned token, give the user `balance` of it and
    /// register it
    pub fn register_erc20(&mut self, decimals: u8, balance: u128) -> TokenPair {
        let deployer = Address::repeat_byte(0xde);
        let erc20 = self
            .keeper
            .evm
            .deploy_token(&mut self.storage, Some(&deployer), "Test Token", "TEST", decimals)
            .unwrap();
        let user = self.user;
        self.keeper
            .evm
            .mint_to(&mut self.storage, &erc20, &user, Uint128::new(balance))
            .unwrap();

        let authority = self.authority;
        self.execute(
            &authority,
            ExecuteMsg::RegisterErc20 {
                erc20_address: erc20.to_checksum(None),
            },
        )
        .unwrap();
        self.token_pair(erc20.to_checksum(None))
    }

    // ========================================================================
    // Packets
    // ========================================================================

    /// Outgoing transfer over the test channel, timing out in ten minutes
    pub fn transfer_msg(&self, denom: &str, amount: u128) -> ExecuteMsg {
        ExecuteMsg::Transfer {
            source_port: TRANSFER_PORT.to_string(),
            source_channel: CHANNEL.to_string(),
            token: Coin::new(amount, denom),
            receiver: "osmo1receiver".to_string(),
            timeout_height: 0,
            timeout_timestamp: self.env.block.time.plus_seconds(600).nanos(),
            memo: String::new(),
        }
    }

    /// Packet relayed from the counterparty to `receiver`
    pub fn incoming_packet(
        &self,
        sequence: u64,
        denom: &str,
        amount: u128,
        receiver: &str,
    ) -> Packet {
        let data = FungibleTokenPacketData {
            denom: denom.to_string(),
            amount: amount.to_string(),
            sender: "osmo1sender".to_string(),
            receiver: receiver.to_string(),
            memo: String::new(),
        };
        self.keeper
            .transfer
            .incoming_packet(&self.storage, CHANNEL, sequence, &data)
            .unwrap()
    }

    pub fn recv_packet(&mut self, packet: &Packet) -> Acknowledgement {
        self.keeper
            .on_recv_packet(&mut self.storage, &self.env, packet)
    }

    pub fn sent_packet(&self, sequence: u64) -> Packet {
        self.keeper
            .transfer
            .sent_packet(&self.storage, CHANNEL, sequence)
            .unwrap()
    }

    pub fn acknowledge(
        &mut self,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<Response, Erc20Error> {
        self.keeper
            .on_acknowledgement_packet(&mut self.storage, &self.env, packet, ack)
    }

    pub fn timeout(&mut self, packet: &Packet) -> Result<Response, Erc20Error> {
        self.keeper
            .on_timeout_packet(&mut self.storage, &self.env, packet)
    }
}
