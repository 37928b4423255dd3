//! Tests for the pair registry.
//!
//! Tests:
//! - RegisterCoin deploys a module-owned contract (authority only)
//! - RegisterCoin rejects duplicates, reserved denoms, bad metadata and
//!   coins without supply
//! - RegisterErc20 binds an existing contract to an `erc20/` denom
//! - RegisterErc20 rejects missing code, proxies and incomplete interfaces
//! - ToggleConversion / SetEnabled by id, denom and contract address
//! - UpdateParams validation
//! - TokenPair / TokenPairs queries

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolCall;
use erc20::erc20_bridge::{
    decimalsCall, Erc20Bridge, EIP1967_BEACON_SLOT, EIP1967_IMPLEMENTATION_SLOT,
};
use erc20::hash::{erc20_denom, token_pair_id};
use erc20::msg::{ExecuteMsg, ParamsResponse, QueryMsg, TokenPairsResponse};
use erc20::state::{ContractOwner, Params};
use erc20::testing::{coin_metadata, setup, Fault};
use erc20::Erc20Error;

// ============================================================================
// RegisterCoin
// ============================================================================

#[test]
fn test_register_coin_deploys_module_owned_contract() {
    let mut env = setup();
    let user = env.user;
    env.fund(&user, 1_000_000, "uatom");

    let authority = env.authority;
    let res = env
        .execute(
            &authority,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata("uatom", "atom", 6),
            },
        )
        .unwrap();

    let pair = env.token_pair("uatom");
    assert_eq!(pair.denom, "uatom");
    assert!(pair.enabled);
    assert_eq!(pair.contract_owner, ContractOwner::Module);
    assert_eq!(pair.coin_exponent, 6);
    assert_eq!(pair.erc20_decimals, 6);
    assert_eq!(pair.id, token_pair_id(&pair.erc20().unwrap(), "uatom"));

    let event = res.events.iter().find(|e| e.ty == "register_coin").unwrap();
    assert!(event
        .attributes
        .iter()
        .any(|a| a.key == "erc20_address" && a.value == pair.erc20_address));

    let bridge = Erc20Bridge::new(&env.keeper.evm, pair.erc20().unwrap());
    assert_eq!(bridge.name(&env.storage).unwrap(), "ATOM");
    assert_eq!(bridge.symbol(&env.storage).unwrap(), "ATOM");
    assert_eq!(bridge.decimals(&env.storage).unwrap(), 6);
}

#[test]
fn test_register_coin_caps_decimals() {
    let mut env = setup();
    let pair = env.register_coin("ubig", 24, 1_000_000);

    assert_eq!(pair.coin_exponent, 24);
    assert_eq!(pair.erc20_decimals, 18);
}

#[test]
fn test_register_coin_rejects_large_exponent() {
    let mut env = setup();
    let user = env.user;
    env.fund(&user, 1, "uhuge");

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata("uhuge", "huge", 40),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::UnsupportedExponent {
            exponent: 40,
            max: 36
        }
    );
}

#[test]
fn test_register_coin_unauthorized() {
    let mut env = setup();
    let user = env.user;
    env.fund(&user, 1_000_000, "uatom");

    let err = env
        .execute(
            &user,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata("uatom", "atom", 6),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::Unauthorized {
            expected: env.authority.to_checksum(None),
            got: user.to_checksum(None),
        }
    );
}

#[test]
fn test_register_coin_duplicate() {
    let mut env = setup();
    env.register_coin("uatom", 6, 1_000_000);

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata("uatom", "atom", 6),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::DuplicatePair { .. }));
}

#[test]
fn test_register_coin_without_supply() {
    let mut env = setup();

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata("ughost", "ghost", 6),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::CoinNotFound {
            denom: "ughost".to_string()
        }
    );
}

#[test]
fn test_register_coin_reserved_denom() {
    let mut env = setup();
    let denom = erc20_denom(&Address::repeat_byte(0x42));
    let user = env.user;
    env.fund(&user, 1, &denom);

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterCoin {
                metadata: coin_metadata(&denom, "wrapped", 18),
            },
        )
        .unwrap_err();
    assert_eq!(err, Erc20Error::ReservedDenom { denom });
}

#[test]
fn test_register_coin_invalid_metadata() {
    let mut env = setup();
    let user = env.user;
    env.fund(&user, 1, "uatom");

    let mut metadata = coin_metadata("uatom", "atom", 6);
    metadata.display = "matom".to_string();

    let authority = env.authority;
    let err = env
        .execute(&authority, ExecuteMsg::RegisterCoin { metadata })
        .unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidMetadata { .. }));
}

// ============================================================================
// RegisterErc20
// ============================================================================

#[test]
fn test_register_erc20() {
    let mut env = setup();
    let pair = env.register_erc20(18, 1_000);
    let erc20 = pair.erc20().unwrap();

    assert_eq!(pair.denom, erc20_denom(&erc20));
    assert_eq!(pair.contract_owner, ContractOwner::External);
    assert_eq!(pair.coin_exponent, 18);
    assert_eq!(pair.erc20_decimals, 18);
    assert!(pair.enabled);

    // Resolvable by all three keys
    assert_eq!(env.token_pair(pair.id.clone()), pair);
    assert_eq!(env.token_pair(pair.denom.clone()), pair);
    assert_eq!(env.token_pair(pair.erc20_address.clone()), pair);
}

#[test]
fn test_register_erc20_duplicate() {
    let mut env = setup();
    let pair = env.register_erc20(18, 1_000);

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterErc20 {
                erc20_address: pair.erc20_address,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::DuplicatePair { .. }));
}

#[test]
fn test_register_erc20_without_code() {
    let mut env = setup();
    let address = Address::repeat_byte(0x77);

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterErc20 {
                erc20_address: address.to_checksum(None),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::ContractNotFound {
            address: address.to_checksum(None)
        }
    );
}

#[test]
fn test_register_erc20_without_token_interface() {
    let mut env = setup();
    let opaque = env.keeper.evm.deploy_opaque(&mut env.storage).unwrap();

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterErc20 {
                erc20_address: opaque.to_checksum(None),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::UnsupportedContractInterface {
            address: opaque.to_checksum(None),
            method: "name()".to_string(),
        }
    );
}

#[test]
fn test_register_erc20_broken_decimals() {
    let mut env = setup();
    let erc20 = env
        .keeper
        .evm
        .deploy_token(&mut env.storage, None, "Broken", "BRK", 6)
        .unwrap();
    env.keeper
        .evm
        .inject(erc20, decimalsCall::SELECTOR, Fault::Garbage);

    let authority = env.authority;
    let err = env
        .execute(
            &authority,
            ExecuteMsg::RegisterErc20 {
                erc20_address: erc20.to_checksum(None),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::UnsupportedContractInterface {
            address: erc20.to_checksum(None),
            method: "decimals()".to_string(),
        }
    );
}

#[test]
fn test_register_erc20_rejects_proxies() {
    for slot in [EIP1967_IMPLEMENTATION_SLOT, EIP1967_BEACON_SLOT] {
        let mut env = setup();
        let erc20 = env
            .keeper
            .evm
            .deploy_token(&mut env.storage, None, "Proxy", "PRX", 18)
            .unwrap();
        env.keeper
            .evm
            .set_storage(&mut env.storage, &erc20, slot, B256::repeat_byte(0x01))
            .unwrap();

        let authority = env.authority;
        let err = env
            .execute(
                &authority,
                ExecuteMsg::RegisterErc20 {
                    erc20_address: erc20.to_checksum(None),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            Erc20Error::UpgradeableContract {
                address: erc20.to_checksum(None)
            }
        );
    }
}

// ============================================================================
// Enablement
// ============================================================================

#[test]
fn test_toggle_conversion_by_any_key() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000_000);
    let authority = env.authority;

    let res = env
        .execute(
            &authority,
            ExecuteMsg::ToggleConversion {
                token: "uatom".to_string(),
            },
        )
        .unwrap();
    assert!(!env.token_pair("uatom").enabled);
    let event = res
        .events
        .iter()
        .find(|e| e.ty == "toggle_token_conversion")
        .unwrap();
    assert!(event
        .attributes
        .iter()
        .any(|a| a.key == "enabled" && a.value == "false"));

    env.execute(
        &authority,
        ExecuteMsg::ToggleConversion {
            token: pair.erc20_address.clone(),
        },
    )
    .unwrap();
    assert!(env.token_pair("uatom").enabled);

    env.execute(
        &authority,
        ExecuteMsg::ToggleConversion {
            token: pair.id.clone(),
        },
    )
    .unwrap();
    assert!(!env.token_pair("uatom").enabled);
}

#[test]
fn test_set_enabled_is_idempotent() {
    let mut env = setup();
    env.register_coin("uatom", 6, 1_000_000);
    let authority = env.authority;

    for _ in 0..2 {
        env.execute(
            &authority,
            ExecuteMsg::SetEnabled {
                token: "uatom".to_string(),
                enabled: false,
            },
        )
        .unwrap();
        assert!(!env.token_pair("uatom").enabled);
    }
}

#[test]
fn test_toggle_unknown_pair() {
    let mut env = setup();
    let authority = env.authority;

    let err = env
        .execute(
            &authority,
            ExecuteMsg::ToggleConversion {
                token: "unknown".to_string(),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Erc20Error::PairNotFound {
            token: "unknown".to_string()
        }
    );
}

#[test]
fn test_toggle_denom_shaped_like_pair_id() {
    let mut env = setup();
    let denom = format!("a{}", "b".repeat(63));
    let pair = env.register_metadata(coin_metadata(&denom, "hexcoin", 6), 1_000);
    assert_eq!(pair.denom, denom);
    assert_ne!(pair.id, denom);
    let authority = env.authority;

    env.execute(
        &authority,
        ExecuteMsg::ToggleConversion {
            token: denom.clone(),
        },
    )
    .unwrap();
    assert!(!env.token_pair(pair.id.clone()).enabled);
    assert!(!env.token_pair(denom).enabled);
}

#[test]
fn test_toggle_unauthorized() {
    let mut env = setup();
    env.register_coin("uatom", 6, 1_000_000);
    let user = env.user;

    let err = env
        .execute(
            &user,
            ExecuteMsg::ToggleConversion {
                token: "uatom".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::Unauthorized { .. }));
    assert!(env.token_pair("uatom").enabled);
}

// ============================================================================
// Params
// ============================================================================

#[test]
fn test_update_params() {
    let mut env = setup();
    let pair = env.register_coin("uatom", 6, 1_000_000);
    let authority = env.authority;

    let params = Params {
        enable_conversion: false,
        enabled_pair_ids: vec![],
        disabled_pair_ids: vec![pair.id.clone()],
    };
    env.execute(
        &authority,
        ExecuteMsg::UpdateParams {
            params: params.clone(),
        },
    )
    .unwrap();

    let res: ParamsResponse = env.query(QueryMsg::Params {}).unwrap();
    assert_eq!(res.params, params);
}

#[test]
fn test_update_params_rejects_malformed_ids() {
    let mut env = setup();
    let authority = env.authority;

    let err = env
        .execute(
            &authority,
            ExecuteMsg::UpdateParams {
                params: Params {
                    enable_conversion: true,
                    enabled_pair_ids: vec!["uatom".to_string()],
                    disabled_pair_ids: vec![],
                },
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::InvalidParams { .. }));

    let res: ParamsResponse = env.query(QueryMsg::Params {}).unwrap();
    assert_eq!(res.params, Params::default());
}

#[test]
fn test_update_params_unauthorized() {
    let mut env = setup();
    let user = env.user;

    let err = env
        .execute(
            &user,
            ExecuteMsg::UpdateParams {
                params: Params::default(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Erc20Error::Unauthorized { .. }));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_token_pairs_pagination() {
    let mut env = setup();
    env.register_coin("uatom", 6, 1_000_000);
    env.register_coin("uosmo", 6, 1_000_000);
    env.register_erc20(18, 1_000);

    let all: TokenPairsResponse = env
        .query(QueryMsg::TokenPairs {
            start_after: None,
            limit: None,
        })
        .unwrap();
    assert_eq!(all.token_pairs.len(), 3);
    let mut ids: Vec<_> = all.token_pairs.iter().map(|p| p.id.clone()).collect();
    let sorted = {
        let mut s = ids.clone();
        s.sort();
        s
    };
    assert_eq!(ids, sorted);

    let page: TokenPairsResponse = env
        .query(QueryMsg::TokenPairs {
            start_after: Some(ids[0].clone()),
            limit: Some(1),
        })
        .unwrap();
    assert_eq!(page.token_pairs.len(), 1);
    assert_eq!(page.token_pairs[0].id, ids.remove(1));
}

#[test]
fn test_token_pair_not_found() {
    let env = setup();
    let res: Result<erc20::msg::TokenPairResponse, _> = env.query(QueryMsg::TokenPair {
        token: "uatom".to_string(),
    });
    assert!(res.is_err());
}
