//! The requester's cart (the draft order).
//!
//! A cart is a plain entity owned by one user. It is never persisted as an
//! order; [`Cart::checkout`] turns it into the command that creates one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocklink_catalog::ProductId;
use stocklink_core::{Actor, DomainError, DomainResult};

use crate::order::{ItemId, OrderItem, SubmitOrder, TransferOrderId};
use crate::status::{Branch, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub qty_requested: u32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    owner: Actor,
    from_branch: Branch,
    to_branch: Branch,
    created_at: DateTime<Utc>,
    lines: Vec<CartLine>,
    next_item_id: u32,
}

impl Cart {
    /// A fresh cart with the default pairing (Queimados requests from Austin).
    pub fn new(owner: Actor, created_at: DateTime<Utc>) -> Self {
        Self {
            owner,
            from_branch: Branch::Queimados,
            to_branch: Branch::Austin,
            created_at,
            lines: Vec::new(),
            next_item_id: 1,
        }
    }

    pub fn owner(&self) -> &Actor {
        &self.owner
    }

    pub fn from_branch(&self) -> Branch {
        self.from_branch
    }

    pub fn to_branch(&self) -> Branch {
        self.to_branch
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Always DRAFT.
    pub fn status(&self) -> OrderStatus {
        OrderStatus::Draft
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `qty` of a product, merging into the existing line for it.
    ///
    /// The caller is responsible for checking that the product exists and is
    /// active.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        qty: i64,
    ) -> DomainResult<ItemId> {
        let qty = positive_qty(qty)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.qty_requested = line
                .qty_requested
                .checked_add(qty)
                .ok_or_else(|| DomainError::validation(TOO_LARGE))?;
            return Ok(line.item_id);
        }

        let item_id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        self.lines.push(CartLine {
            item_id,
            product_id,
            product_name: product_name.into(),
            qty_requested: qty,
            note: String::new(),
        });
        Ok(item_id)
    }

    /// Overwrite quantities; a value of zero or less removes the line.
    /// Unknown item ids are ignored. Nothing changes if any value is too large.
    pub fn update_quantities(&mut self, updates: &BTreeMap<ItemId, i64>) -> DomainResult<()> {
        let mut checked = Vec::with_capacity(updates.len());
        for (item_id, qty) in updates {
            let qty = if *qty <= 0 { None } else { Some(positive_qty(*qty)?) };
            checked.push((*item_id, qty));
        }

        for (item_id, qty) in checked {
            match qty {
                Some(qty) => {
                    if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item_id) {
                        line.qty_requested = qty;
                    }
                }
                None => self.lines.retain(|l| l.item_id != item_id),
            }
        }
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: ItemId) -> DomainResult<CartLine> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.item_id == item_id)
            .ok_or(DomainError::NotFound)?;
        Ok(self.lines.remove(idx))
    }

    /// Convert the cart into the command that submits it as `order_id`.
    pub fn checkout(
        self,
        order_id: TransferOrderId,
        submitted_at: DateTime<Utc>,
    ) -> DomainResult<SubmitOrder> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("empty cart"));
        }

        let items = self
            .lines
            .into_iter()
            .map(|l| OrderItem {
                item_id: l.item_id,
                product_id: l.product_id,
                product_name: l.product_name,
                qty_requested: l.qty_requested,
                qty_sent: 0,
                note: l.note,
            })
            .collect();

        Ok(SubmitOrder {
            order_id,
            from_branch: self.from_branch,
            to_branch: self.to_branch,
            created_by: self.owner,
            created_at: self.created_at,
            items,
            occurred_at: submitted_at,
        })
    }
}

const TOO_LARGE: &str = "quantity is too large";

fn positive_qty(qty: i64) -> DomainResult<u32> {
    if qty <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    u32::try_from(qty).map_err(|_| DomainError::validation(TOO_LARGE))
}
