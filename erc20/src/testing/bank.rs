//! Store-backed ledger

use alloy::primitives::Address;
use cosmwasm_std::{Coin, StdError, StdResult, Storage, Uint128};
use cw_storage_plus::Map;

use crate::interfaces::BankKeeper;

/// Balances keyed by (checksum account, denom)
const BALANCES: Map<(&str, &str), Uint128> = Map::new("mock_bank_balances");

const SUPPLY: Map<&str, Uint128> = Map::new("mock_bank_supply");

#[derive(Clone, Copy, Debug, Default)]
pub struct MockBank;

impl MockBank {
    /// Mint coins to an account
    pub fn fund(&self, store: &mut dyn Storage, account: &Address, coin: &Coin) -> StdResult<()> {
        self.credit(store, account, &coin.denom, coin.amount)
    }
}

impl BankKeeper for MockBank {
    fn balance(&self, store: &dyn Storage, account: &Address, denom: &str) -> StdResult<Uint128> {
        let key = account.to_checksum(None);
        Ok(BALANCES
            .may_load(store, (key.as_str(), denom))?
            .unwrap_or_default())
    }

    fn supply(&self, store: &dyn Storage, denom: &str) -> StdResult<Uint128> {
        Ok(SUPPLY.may_load(store, denom)?.unwrap_or_default())
    }

    fn credit(
        &self,
        store: &mut dyn Storage,
        account: &Address,
        denom: &str,
        amount: Uint128,
    ) -> StdResult<()> {
        let key = account.to_checksum(None);
        let balance = self.balance(store, account, denom)?.checked_add(amount)?;
        BALANCES.save(store, (key.as_str(), denom), &balance)?;
        let supply = self.supply(store, denom)?.checked_add(amount)?;
        SUPPLY.save(store, denom, &supply)
    }

    fn debit(
        &self,
        store: &mut dyn Storage,
        account: &Address,
        denom: &str,
        amount: Uint128,
    ) -> StdResult<()> {
        let key = account.to_checksum(None);
        let balance = self.balance(store, account, denom)?;
        if balance < amount {
            return Err(StdError::generic_err(format!(
                "insufficient funds: {} has {}{}, needs {}{}",
                key, balance, denom, amount, denom
            )));
        }
        let remaining = balance - amount;
        if remaining.is_zero() {
            BALANCES.remove(store, (key.as_str(), denom));
        } else {
            BALANCES.save(store, (key.as_str(), denom), &remaining)?;
        }
        let supply = self.supply(store, denom)?.checked_sub(amount)?;
        SUPPLY.save(store, denom, &supply)
    }
}
