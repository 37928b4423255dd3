//! Tests for the conversion engine.
//!
//! Tests:
//! - ConvertCoin / ConvertErc20 round trips for module-owned and external pairs
//! - Unit scaling between coin exponent and contract decimals, with
//!   precision loss rejected
//! - Enablement gates (global switch, pair flag, allow / deny lists)
//! - Atomicity when the contract reverts or misbehaves
//! - Escrow backing after every conversion

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use cosmwasm_std::{Coin, Uint128};

use erc20::erc20_bridge::{mintCall, transferCall, EscrowStatus};
use erc20::msg::{ExecuteMsg, QueryMsg};
use erc20::state::{Params, TokenPair};
use erc20::testing::{setup, Fault, TestEnv};
use erc20::Erc20Error;

fn convert_coin(env: &mut TestEnv, amount: u128, denom: &str) -> Result<(), Erc20Error> {
    let user = env.user;
    env.execute(
        &user,
        ExecuteMsg::ConvertCoin {
            coin: Coin::new(amount, denom),
            receiver: None,
        },
    )
    .map(|_| ())
}

fn convert_erc20(env: &mut TestEnv, amount: u128, pair: &TokenPair) -> Result<(), Erc20Error> {
    let user = env.user;
    env.execute(
        &user,
        ExecuteMsg::ConvertErc20 {
            contract_address: pair.erc20_address.clone(),
            amount: Uint128::new(amount),
            receiver: None,
        },
    )
    .map(|_| ())
}

fn escrow_status(env: &TestEnv, pair: &TokenPair) -> EscrowStatus {
    env.query(QueryMsg::EscrowStatus {
        token: pair.id.clone(),
    })
    .unwrap()
}

fn update_params(env: &mut TestEnv, params: Params) {
    let authority = env.authority;
    env.execute(&authority, ExecuteMsg::UpdateParams { params })
        .unwrap();
}

// ============================================================================
// Module-owned pairs
// ============================================================================

#[test]
fn test_native_coin_round_trip() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000_000);
    let (user, module) = (env.user, env.module);

    convert_coin(&mut env, 400_000, "uatom").unwrap();
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(600_000));
    assert_eq!(env.balance(&module, "uatom"), Uint128::new(400_000));
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(400_000));
    assert_eq!(env.erc20_supply(&pair), Uint128::new(400_000));

    convert_erc20(&mut env, 150_000, &pair).unwrap();
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(750_000));
    assert_eq!(env.balance(&module, "uatom"), Uint128::new(250_000));
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(250_000));
    assert_eq!(env.erc20_supply(&pair), Uint128::new(250_000));

    // Ledger supply is untouched by escrow
    assert_eq!(env.supply("uatom"), Uint128::new(1_000_000));

    let status = escrow_status(&env, &pair);
    assert_eq!(status.escrowed, Uint128::new(250_000));
    assert_eq!(status.outstanding, Uint128::new(250_000));
    assert!(status.healthy);
}

#[test]
fn test_convert_coin_emits_event() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let user = env.user;

    let res = env
        .execute(
            &user,
            ExecuteMsg::ConvertCoin {
                coin: Coin::new(10, "uatom"),
                receiver: None,
            },
        )
        .unwrap();

    assert_eq!(res.attributes[0].value, "convert_coin");
    let event = res.events.iter().find(|e| e.ty == "convert_coin").unwrap();
    let attr = |key: &str| {
        event
            .attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.clone())
            .unwrap()
    };
    assert_eq!(attr("pair_id"), pair.id);
    assert_eq!(attr("amount"), "10");
    assert_eq!(attr("erc20_amount"), "10");
    assert_eq!(attr("sender"), user.to_checksum(None));
    assert_eq!(attr("receiver"), user.to_checksum(None));
}

#[test]
fn test_convert_to_other_receiver() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let user = env.user;
    let friend = Address::repeat_byte(0x22);

    env.execute(
        &user,
        ExecuteMsg::ConvertCoin {
            coin: Coin::new(100, "uatom"),
            receiver: Some(friend.to_checksum(None)),
        },
    )
    .unwrap();
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::zero());
    assert_eq!(env.erc20_balance(&pair, &friend), Uint128::new(100));

    env.execute(
        &friend,
        ExecuteMsg::ConvertErc20 {
            contract_address: pair.erc20_address.clone(),
            amount: Uint128::new(40),
            receiver: Some(user.to_checksum(None)),
        },
    )
    .unwrap();
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(940));
    assert_eq!(env.balance(&friend, "uatom"), Uint128::zero());
    assert_eq!(env.erc20_balance(&pair, &friend), Uint128::new(60));
}

#[test]
fn test_convert_to_module_account_rejected() {
    let mut env = setup();
    env.register_coin("uatom", 6, 1_000);
    let (user, module) = (env.user, env.module);

    let err = env
        .execute(
            &user,
            ExecuteMsg::ConvertCoin {
                coin: Coin::new(100, "uatom"),
                receiver: Some(module.to_checksum(None)),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidAddress { .. }));
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(1_000));
}

// ============================================================================
// External pairs
// ============================================================================

#[test]
fn test_external_token_round_trip() {
    let mut env = setup();
    let pair = env.register_erc20(18, 1_000);
    let (user, module) = (env.user, env.module);

    convert_erc20(&mut env, 700, &pair).unwrap();
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(300));
    assert_eq!(env.erc20_balance(&pair, &module), Uint128::new(700));
    assert_eq!(env.balance(&user, &pair.denom), Uint128::new(700));
    assert_eq!(env.supply(&pair.denom), Uint128::new(700));

    convert_coin(&mut env, 200, &pair.denom).unwrap();
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(500));
    assert_eq!(env.erc20_balance(&pair, &module), Uint128::new(500));
    assert_eq!(env.balance(&user, &pair.denom), Uint128::new(500));
    assert_eq!(env.supply(&pair.denom), Uint128::new(500));

    // Contract supply never changes for external tokens
    assert_eq!(env.erc20_supply(&pair), Uint128::new(1_000));

    let status = escrow_status(&env, &pair);
    assert_eq!(status.escrowed, Uint128::new(500));
    assert_eq!(status.outstanding, Uint128::new(500));
    assert!(status.healthy);
}

#[test]
fn test_external_transfer_returning_false_rolls_back() {
    let mut env = setup();
    let pair = env.register_erc20(18, 1_000);
    let user = env.user;
    env.keeper
        .evm
        .inject(pair.erc20().unwrap(), transferCall::SELECTOR, Fault::ReturnFalse);

    let err = convert_erc20(&mut env, 100, &pair).unwrap_err();
    assert_eq!(
        err,
        Erc20Error::ContractReverted {
            contract: pair.erc20_address.clone(),
            reason: "transfer returned false".to_string(),
        }
    );
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(1_000));
    assert_eq!(env.balance(&user, &pair.denom), Uint128::zero());
}

#[test]
fn test_external_silent_transfer_breaks_balance_invariant() {
    let mut env = setup();
    let pair = env.register_erc20(18, 1_000);
    let user = env.user;
    env.keeper
        .evm
        .inject(pair.erc20().unwrap(), transferCall::SELECTOR, Fault::Silent);

    let err = convert_erc20(&mut env, 100, &pair).unwrap_err();
    assert_eq!(
        err,
        Erc20Error::BalanceInvariant {
            contract: pair.erc20_address.clone(),
            expected: Uint128::new(900),
            actual: Uint128::new(1_000),
        }
    );
    assert_eq!(env.balance(&user, &pair.denom), Uint128::zero());
}

// ============================================================================
// Scaling
// ============================================================================

#[test]
fn test_scaling_with_capped_decimals() {
    let mut env = setup();
    // 20 coin decimals, 18 contract decimals: 100 base units per token unit
    let pair = env.register_coin("ufine", 20, 1_000);
    let user = env.user;

    let err = convert_coin(&mut env, 150, "ufine").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::PrecisionLoss {
            amount: Uint128::new(150),
            unit: Uint128::new(100),
        }
    );
    assert_eq!(env.balance(&user, "ufine"), Uint128::new(1_000));

    convert_coin(&mut env, 200, "ufine").unwrap();
    assert_eq!(env.balance(&user, "ufine"), Uint128::new(800));
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(2));

    convert_erc20(&mut env, 1, &pair).unwrap();
    assert_eq!(env.balance(&user, "ufine"), Uint128::new(900));
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(1));

    let status = escrow_status(&env, &pair);
    assert_eq!(status.escrowed, Uint128::new(100));
    assert_eq!(status.outstanding, Uint128::new(100));
}

// ============================================================================
// Enablement
// ============================================================================

#[test]
fn test_conversions_disabled_globally() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let user = env.user;
    update_params(
        &mut env,
        Params {
            enable_conversion: false,
            ..Params::default()
        },
    );

    let err = convert_coin(&mut env, 100, "uatom").unwrap_err();
    assert_eq!(err, Erc20Error::ConversionDisabled);
    let err = convert_erc20(&mut env, 100, &pair).unwrap_err();
    assert_eq!(err, Erc20Error::ConversionDisabled);
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(1_000));
}

#[test]
fn test_disabled_pair_rejected() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let (user, authority) = (env.user, env.authority);
    env.execute(
        &authority,
        ExecuteMsg::SetEnabled {
            token: "uatom".to_string(),
            enabled: false,
        },
    )
    .unwrap();

    let err = convert_coin(&mut env, 100, "uatom").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::PairDisabled {
            token: pair.id.clone()
        }
    );
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(1_000));
    assert_eq!(env.erc20_supply(&pair), Uint128::zero());
}

#[test]
fn test_deny_list_wins_over_allow_list() {
    let mut env = setup();
    let atom = env.register_coin("uatom", 6, 1_000);
    let osmo = env.register_coin("uosmo", 6, 1_000);

    update_params(
        &mut env,
        Params {
            enable_conversion: true,
            enabled_pair_ids: vec![atom.id.clone(), osmo.id.clone()],
            disabled_pair_ids: vec![osmo.id.clone()],
        },
    );
    convert_coin(&mut env, 100, "uatom").unwrap();
    let err = convert_coin(&mut env, 100, "uosmo").unwrap_err();
    assert_eq!(err, Erc20Error::PairDisabled { token: osmo.id });
}

#[test]
fn test_allow_list_restricts_pairs() {
    let mut env = setup();
    let atom = env.register_coin("uatom", 6, 1_000);
    let osmo = env.register_coin("uosmo", 6, 1_000);

    update_params(
        &mut env,
        Params {
            enable_conversion: true,
            enabled_pair_ids: vec![atom.id.clone()],
            disabled_pair_ids: vec![],
        },
    );
    convert_coin(&mut env, 100, "uatom").unwrap();
    let err = convert_coin(&mut env, 100, "uosmo").unwrap_err();
    assert_eq!(err, Erc20Error::PairDisabled { token: osmo.id });
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_zero_amount_rejected() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);

    let err = convert_coin(&mut env, 0, "uatom").unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidAmount { .. }));
    let err = convert_erc20(&mut env, 0, &pair).unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidAmount { .. }));
}

#[test]
fn test_unregistered_coin() {
    let mut env = setup();
    let user = env.user;
    env.fund(&user, 1_000, "uatom");

    let err = convert_coin(&mut env, 100, "uatom").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::PairNotFound {
            token: "uatom".to_string()
        }
    );
}

#[test]
fn test_insufficient_balances() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);

    let err = convert_coin(&mut env, 1_001, "uatom").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::InsufficientLedgerBalance {
            denom: "uatom".to_string(),
            needed: Uint128::new(1_001),
            available: Uint128::new(1_000),
        }
    );

    convert_coin(&mut env, 100, "uatom").unwrap();
    let err = convert_erc20(&mut env, 101, &pair).unwrap_err();
    assert_eq!(
        err,
        Erc20Error::InsufficientContractBalance {
            contract: pair.erc20_address.clone(),
            needed: Uint128::new(101),
            available: Uint128::new(100),
        }
    );
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn test_mint_revert_leaves_no_trace() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let (user, module) = (env.user, env.module);
    env.keeper.evm.inject(
        pair.erc20().unwrap(),
        mintCall::SELECTOR,
        Fault::Revert("paused".to_string()),
    );

    let err = convert_coin(&mut env, 100, "uatom").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::ContractReverted {
            contract: pair.erc20_address.clone(),
            reason: "paused".to_string(),
        }
    );
    // The escrow send happened before the mint and was discarded with it
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(1_000));
    assert_eq!(env.balance(&module, "uatom"), Uint128::zero());
    assert_eq!(env.erc20_supply(&pair), Uint128::zero());

    env.keeper
        .evm
        .clear(pair.erc20().unwrap(), mintCall::SELECTOR);
    convert_coin(&mut env, 100, "uatom").unwrap();
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(100));
}

#[test]
fn test_silent_mint_breaks_balance_invariant() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    let (user, module) = (env.user, env.module);
    env.keeper
        .evm
        .inject(pair.erc20().unwrap(), mintCall::SELECTOR, Fault::Silent);

    let err = convert_coin(&mut env, 100, "uatom").unwrap_err();
    assert_eq!(
        err,
        Erc20Error::BalanceInvariant {
            contract: pair.erc20_address.clone(),
            expected: Uint128::new(100),
            actual: Uint128::zero(),
        }
    );
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(1_000));
    assert_eq!(env.balance(&module, "uatom"), Uint128::zero());
}

#[test]
fn test_empty_revert_reason() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000);
    convert_coin(&mut env, 100, "uatom").unwrap();
    env.keeper.evm.inject(
        pair.erc20().unwrap(),
        erc20::erc20_bridge::burnCoinsCall::SELECTOR,
        Fault::RevertEmpty,
    );

    let err = convert_erc20(&mut env, 50, &pair).unwrap_err();
    assert_eq!(
        err,
        Erc20Error::ContractReverted {
            contract: pair.erc20_address.clone(),
            reason: "execution reverted".to_string(),
        }
    );
    let user = env.user;
    assert_eq!(env.erc20_balance(&pair, &user), Uint128::new(100));
    assert_eq!(env.balance(&user, "uatom"), Uint128::new(900));
}
