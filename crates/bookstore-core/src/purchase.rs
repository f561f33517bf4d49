//! # Purchase Order State Machine
//!
//! The single transition table for purchase orders.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              Pay                      Arrive                            │
//! │   ┌────────┐ ───────► ┌────────┐ ────────────► ┌─────────┐              │
//! │   │ unpaid │          │  paid  │               │ arrived │ (terminal)   │
//! │   └────────┘          └────────┘               └─────────┘              │
//! │        │                  │                         │                   │
//! │        │ Return           └── Bill(purchase)        └── stock += qty    │
//! │        ▼                                                                │
//! │   ┌──────────┐                                                          │
//! │   │ returned │ (terminal)                                              │
//! │   └──────────┘                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every lifecycle operation in bookstore-db calls [`PurchaseStatus::apply`]
//! before it touches storage, and then writes the new status with a
//! compare-and-swap on the old one.
//!
//! ```rust
//! use bookstore_core::purchase::{PurchaseAction, PurchaseStatus};
//!
//! assert_eq!(
//!     PurchaseStatus::Paid.apply(PurchaseAction::Arrive).unwrap(),
//!     PurchaseStatus::Arrived,
//! );
//! assert!(PurchaseStatus::Returned.apply(PurchaseAction::Pay).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Purchase Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Ordered, nothing paid yet.
    Unpaid,
    /// Paid to the supplier, goods not yet received.
    Paid,
    /// Cancelled before payment.
    Returned,
    /// Goods received and added to stock.
    Arrived,
}

impl Default for PurchaseStatus {
    fn default() -> Self {
        PurchaseStatus::Unpaid
    }
}

impl PurchaseStatus {
    pub const ALL: [PurchaseStatus; 4] = [
        PurchaseStatus::Unpaid,
        PurchaseStatus::Paid,
        PurchaseStatus::Returned,
        PurchaseStatus::Arrived,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Unpaid => "unpaid",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Returned => "returned",
            PurchaseStatus::Arrived => "arrived",
        }
    }

    /// Applies an action and returns the next status.
    ///
    /// ## Transition Table
    /// | from   | Pay  | Return   | Arrive  |
    /// |--------|------|----------|---------|
    /// | unpaid | paid | returned | ✗       |
    /// | paid   | ✗    | ✗        | arrived |
    /// | other  | ✗    | ✗        | ✗       |
    ///
    /// ✗ is [`CoreError::InvalidTransition`].
    pub fn apply(self, action: PurchaseAction) -> CoreResult<PurchaseStatus> {
        use PurchaseAction::*;
        use PurchaseStatus::*;

        match (self, action) {
            (Unpaid, Pay) => Ok(Paid),
            (Unpaid, Return) => Ok(Returned),
            (Paid, Arrive) => Ok(Arrived),
            (from, action) => Err(CoreError::InvalidTransition { from, action }),
        }
    }

    /// No action leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        PurchaseAction::ALL
            .iter()
            .all(|action| self.apply(*action).is_err())
    }

    /// Checks operator attribution against this status.
    ///
    /// The settling operator (payer or returner) is recorded iff the order has
    /// left `unpaid`; the receiving operator iff it has `arrived`. The schema
    /// enforces the same rule with CHECK constraints.
    pub fn attribution_consistent(&self, has_settler: bool, has_receiver: bool) -> bool {
        let settled = *self != PurchaseStatus::Unpaid;
        let received = *self == PurchaseStatus::Arrived;
        has_settler == settled && has_receiver == received
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchaseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: PurchaseStatus::ALL
                    .iter()
                    .map(|status| status.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Purchase Action
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseAction {
    Pay,
    Return,
    Arrive,
}

impl PurchaseAction {
    pub const ALL: [PurchaseAction; 3] = [
        PurchaseAction::Pay,
        PurchaseAction::Return,
        PurchaseAction::Arrive,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseAction::Pay => "pay",
            PurchaseAction::Return => "return",
            PurchaseAction::Arrive => "arrive",
        }
    }
}

impl fmt::Display for PurchaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_allowed_transitions() {
        use PurchaseAction::*;
        use PurchaseStatus::*;

        assert_eq!(Unpaid.apply(Pay).unwrap(), Paid);
        assert_eq!(Unpaid.apply(Return).unwrap(), Returned);
        assert_eq!(Paid.apply(Arrive).unwrap(), Arrived);
    }

    #[test]
    fn test_exactly_three_transitions_allowed() {
        let allowed = PurchaseStatus::ALL
            .iter()
            .flat_map(|s| PurchaseAction::ALL.iter().map(move |a| s.apply(*a)))
            .filter(Result::is_ok)
            .count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn test_rejected_transitions_are_invalid_state() {
        for from in [PurchaseStatus::Paid, PurchaseStatus::Returned, PurchaseStatus::Arrived] {
            let err = from.apply(PurchaseAction::Pay).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }

        let err = PurchaseStatus::Unpaid.apply(PurchaseAction::Arrive).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: PurchaseStatus::Unpaid,
                action: PurchaseAction::Arrive,
            }
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PurchaseStatus::Unpaid.is_terminal());
        assert!(!PurchaseStatus::Paid.is_terminal());
        assert!(PurchaseStatus::Returned.is_terminal());
        assert!(PurchaseStatus::Arrived.is_terminal());
    }

    #[test]
    fn test_transitions_keep_attribution_consistent() {
        // Each transition sets exactly the attribution its target status needs
        assert!(PurchaseStatus::Unpaid.attribution_consistent(false, false));
        assert!(PurchaseStatus::Paid.attribution_consistent(true, false));
        assert!(PurchaseStatus::Returned.attribution_consistent(true, false));
        assert!(PurchaseStatus::Arrived.attribution_consistent(true, true));

        assert!(!PurchaseStatus::Unpaid.attribution_consistent(true, false));
        assert!(!PurchaseStatus::Paid.attribution_consistent(true, true));
        assert!(!PurchaseStatus::Arrived.attribution_consistent(true, false));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("arrived".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Arrived);
        assert!("shipped".parse::<PurchaseStatus>().is_err());
    }
}
