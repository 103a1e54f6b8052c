//! Branches, order statuses and the transition table.
//!
//! Every status guard in the workflow goes through [`OrderStatus::transition`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stocklink_core::{DomainError, DomainResult};

/// The two fixed branches goods move between.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Branch {
    /// Base branch; supplies goods.
    Austin,
    /// Filial; requests goods.
    Queimados,
}

impl Branch {
    pub fn code(self) -> &'static str {
        match self {
            Branch::Austin => "AUSTIN",
            Branch::Queimados => "QUEIMADOS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Branch::Austin => "Austin (base)",
            Branch::Queimados => "Queimados (filial)",
        }
    }
}

impl core::fmt::Display for Branch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Branch {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUSTIN" => Ok(Branch::Austin),
            "QUEIMADOS" => Ok(Branch::Queimados),
            other => Err(DomainError::validation(format!("unknown branch: {other}"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Draft,
    Submitted,
    Picking,
    Dispatched,
    Received,
    /// Declared for completeness; no workflow step leads here.
    Cancelled,
}

/// A workflow step that moves an order between statuses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransferAction {
    Submit,
    StartPicking,
    Dispatch,
    ConfirmReceipt,
}

impl TransferAction {
    fn describe(self) -> &'static str {
        match self {
            TransferAction::Submit => "submit",
            TransferAction::StartPicking => "start picking",
            TransferAction::Dispatch => "dispatch",
            TransferAction::ConfirmReceipt => "confirm receipt",
        }
    }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Draft,
        OrderStatus::Submitted,
        OrderStatus::Picking,
        OrderStatus::Dispatched,
        OrderStatus::Received,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::Picking => "PICKING",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Human label shown next to the code.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft (cart)",
            OrderStatus::Submitted => "Submitted",
            OrderStatus::Picking => "Picking",
            OrderStatus::Dispatched => "Dispatched",
            OrderStatus::Received => "Received",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Received | OrderStatus::Cancelled)
    }

    /// The transition table.
    ///
    /// | from       | action         | to         |
    /// |------------|----------------|------------|
    /// | DRAFT      | Submit         | SUBMITTED  |
    /// | SUBMITTED  | StartPicking   | PICKING    |
    /// | PICKING    | Dispatch       | DISPATCHED |
    /// | DISPATCHED | ConfirmReceipt | RECEIVED   |
    pub fn transition(self, action: TransferAction) -> DomainResult<OrderStatus> {
        use OrderStatus::*;
        use TransferAction::*;

        match (self, action) {
            (Draft, Submit) => Ok(Submitted),
            (Submitted, StartPicking) => Ok(Picking),
            (Picking, Dispatch) => Ok(Dispatched),
            (Dispatched, ConfirmReceipt) => Ok(Received),
            (_, ConfirmReceipt) => Err(DomainError::invalid_transition("not yet dispatched")),
            (from, action) => Err(DomainError::invalid_transition(format!(
                "cannot {} an order in status {}",
                action.describe(),
                from.code()
            ))),
        }
    }

    /// Item quantities may only change while the supplier is picking.
    pub fn ensure_items_editable(self) -> DomainResult<()> {
        if self == OrderStatus::Picking {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(format!(
                "items can only be changed while picking (status {})",
                self.code()
            )))
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}
