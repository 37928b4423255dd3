//! Cached store branches.
//!
//! Every state transition runs on a [`CacheStore`] layered over the shared
//! storage. The ledger, the contract engine and this module all write into
//! the same branch, so a transition either commits all of its writes or
//! none of them. Branches nest: a hook can try a side operation in an inner
//! branch and drop it without touching the outer one.

use std::collections::BTreeMap;

use cosmwasm_std::{Order, Record, Storage};

/// Write-buffering view over another store
pub struct CacheStore<'a> {
    base: &'a mut dyn Storage,
    /// Pending writes; `None` marks a deletion
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(base: &'a mut dyn Storage) -> Self {
        Self {
            base,
            ops: BTreeMap::new(),
        }
    }

    /// Flush every pending write into the underlying store
    pub fn commit(self) {
        for (key, op) in self.ops {
            match op {
                Some(value) => self.base.set(&key, &value),
                None => self.base.remove(&key),
            }
        }
    }

    /// Drop every pending write
    pub fn discard(self) {}

    pub fn is_dirty(&self) -> bool {
        !self.ops.is_empty()
    }
}

impl<'a> Storage for CacheStore<'a> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.ops.get(key) {
            Some(op) => op.clone(),
            None => self.base.get(key),
        }
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        let in_bounds = |key: &[u8]| {
            start.map_or(true, |s| key >= s) && end.map_or(true, |e| key < e)
        };

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .base
            .range(start, end, Order::Ascending)
            .collect();
        for (key, op) in self.ops.iter().filter(|(k, _)| in_bounds(k)) {
            match op {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        match order {
            Order::Ascending => Box::new(merged.into_iter()),
            Order::Descending => Box::new(merged.into_iter().rev()),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.ops.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.ops.insert(key.to_vec(), None);
    }
}

/// Run `f` on a fresh branch of `storage`, committing only when it succeeds
pub fn transactional<T, E, F>(storage: &mut dyn Storage, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn Storage) -> Result<T, E>,
{
    let mut branch = CacheStore::new(storage);
    let result = f(&mut branch)?;
    branch.commit();
    Ok(result)
}
