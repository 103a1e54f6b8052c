//! Per-user cart storage.
//!
//! Carts are keyed by owner, so a user can never hold two drafts. Every
//! operation runs under one lock, which also serializes get-or-create.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use stocklink_core::{Actor, DomainResult, UserId};
use stocklink_transfers::Cart;

#[derive(Debug, Default)]
pub struct CartStore {
    carts: Mutex<HashMap<UserId, Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Carts only change through `Cart` methods that validate before writing,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Cart>> {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The owner's cart, created empty on first use.
    pub fn get_or_create(&self, owner: &Actor, now: DateTime<Utc>) -> Cart {
        self.lock()
            .entry(owner.user_id)
            .or_insert_with(|| Cart::new(owner.clone(), now))
            .clone()
    }

    /// Mutate the owner's cart (creating it if needed).
    pub fn update<T>(
        &self,
        owner: &Actor,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Cart) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let mut carts = self.lock();
        let cart = carts
            .entry(owner.user_id)
            .or_insert_with(|| Cart::new(owner.clone(), now));
        f(cart)
    }

    /// Number of lines in the user's cart (0 without a cart).
    pub fn line_count(&self, user_id: UserId) -> usize {
        self.lock().get(&user_id).map_or(0, Cart::line_count)
    }

    /// Hand a copy of the cart to `submit` and discard the cart only if it
    /// succeeds.
    ///
    /// The lock is held for the whole call, so no line can be added between
    /// the snapshot and the discard.
    pub fn checkout<T, E>(
        &self,
        owner: &Actor,
        now: DateTime<Utc>,
        submit: impl FnOnce(Cart) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut carts = self.lock();
        let cart = carts
            .entry(owner.user_id)
            .or_insert_with(|| Cart::new(owner.clone(), now))
            .clone();

        let out = submit(cart)?;
        carts.remove(&owner.user_id);
        Ok(out)
    }
}
