//! Tests for instantiate, migrate and configuration queries.

use alloy::primitives::Address;
use cosmwasm_std::testing::{mock_env, MockStorage};

use erc20::hash::module_address;
use erc20::msg::{ConfigResponse, InstantiateMsg, MigrateMsg, ParamsResponse, QueryMsg};
use erc20::state::{Params, MODULE_NAME, PARAMS};
use erc20::testing::{setup, MockBank, MockEvm, MockKeeper, MockTransfer, NATIVE_DENOM};
use erc20::{Erc20Error, Keeper};

fn keeper() -> MockKeeper {
    Keeper::new(MockBank, MockEvm::new(), MockTransfer::new())
}

fn instantiate_msg() -> InstantiateMsg {
    InstantiateMsg {
        authority: Address::repeat_byte(0xaa).to_checksum(None),
        module_address: None,
        native_denom: NATIVE_DENOM.to_string(),
        exempt_addresses: vec![],
        params: None,
    }
}

#[test]
fn test_instantiate_defaults() {
    let env = setup();

    let config: ConfigResponse = env.query(QueryMsg::Config {}).unwrap();
    assert_eq!(config.authority, env.authority.to_checksum(None));
    assert_eq!(
        config.module_address,
        module_address(MODULE_NAME).to_checksum(None)
    );
    assert_eq!(config.native_denom, NATIVE_DENOM);
    assert!(config.exempt_addresses.is_empty());

    let params: ParamsResponse = env.query(QueryMsg::Params {}).unwrap();
    assert_eq!(params.params, Params::default());
    assert!(params.params.enable_conversion);
}

#[test]
fn test_instantiate_normalizes_addresses() {
    let keeper = keeper();
    let mut storage = MockStorage::new();
    let exempt = Address::repeat_byte(0x33);

    let mut msg = instantiate_msg();
    msg.authority = msg.authority.to_lowercase();
    msg.exempt_addresses = vec![erc20::address::encode_bech32_address(&exempt, "shido").unwrap()];
    keeper.instantiate(&mut storage, &mock_env(), msg).unwrap();

    let config: ConfigResponse =
        cosmwasm_std::from_json(keeper.query(&storage, &mock_env(), QueryMsg::Config {}).unwrap())
            .unwrap();
    assert_eq!(config.authority, Address::repeat_byte(0xaa).to_checksum(None));
    assert_eq!(config.exempt_addresses, vec![exempt.to_checksum(None)]);
}

#[test]
fn test_instantiate_rejects_bad_input() {
    let keeper = keeper();

    let mut msg = instantiate_msg();
    msg.authority = "nobody".to_string();
    let mut storage = MockStorage::new();
    let err = keeper
        .instantiate(&mut storage, &mock_env(), msg)
        .unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidAddress { .. }));

    let mut msg = instantiate_msg();
    msg.native_denom = "1bad".to_string();
    let mut storage = MockStorage::new();
    assert!(keeper.instantiate(&mut storage, &mock_env(), msg).is_err());

    let mut msg = instantiate_msg();
    msg.params = Some(Params {
        enable_conversion: true,
        enabled_pair_ids: vec![],
        disabled_pair_ids: vec!["not-a-pair-id".to_string()],
    });
    let mut storage = MockStorage::new();
    let err = keeper
        .instantiate(&mut storage, &mock_env(), msg)
        .unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidParams { .. }));
    // Nothing is written when instantiation fails
    assert!(PARAMS.may_load(&storage).unwrap().is_none());
}

#[test]
fn test_migrate_restores_missing_params() {
    let mut env = setup();
    PARAMS.remove(&mut env.storage);

    env.keeper
        .migrate(&mut env.storage, &env.env, MigrateMsg {})
        .unwrap();

    let params: ParamsResponse = env.query(QueryMsg::Params {}).unwrap();
    assert_eq!(params.params, Params::default());
    let version = cw2::get_contract_version(&env.storage).unwrap();
    assert_eq!(version.contract, "crates.io:erc20");
}
