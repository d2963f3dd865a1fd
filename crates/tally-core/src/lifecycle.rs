//! # Sale State Machine
//!
//! Which status changes and edits are allowed for a persisted sale. Both the
//! session layer (before calling out) and the SQLite gateway (inside its
//! transaction) consult these functions.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  From               Event                    To            Stock        │
//! │  ────────────────   ──────────────────────   ───────────   ──────────── │
//! │  (none)             submit                   pending or    decrement    │
//! │                                              completed                  │
//! │  pending/completed  add/update/remove item   same          delta        │
//! │  pending            confirm                  completed     none         │
//! │  pending/completed  cancel(reason)           cancelled     restore all  │
//! │  pending/completed  refund(reason)           refunded      restore all  │
//! │  cancelled/refunded anything                 REJECTED                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::SaleStatus;

/// A request to move a sale along the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleEvent {
    Confirm,
    Cancel,
    Refund,
}

impl SaleEvent {
    pub const fn target(&self) -> SaleStatus {
        match self {
            SaleEvent::Confirm => SaleStatus::Completed,
            SaleEvent::Cancel => SaleStatus::Cancelled,
            SaleEvent::Refund => SaleStatus::Refunded,
        }
    }

    pub const fn requires_reason(&self) -> bool {
        self.target().is_terminal()
    }
}

/// Rejects any mutation against a terminal sale.
pub fn ensure_editable(sale_id: &str, status: SaleStatus) -> CoreResult<()> {
    if status.is_terminal() {
        return Err(CoreError::TerminalSale {
            sale_id: sale_id.to_string(),
            status,
        });
    }
    Ok(())
}

/// Whether the table above has an edge `from → to`.
pub const fn can_transition(from: SaleStatus, to: SaleStatus) -> bool {
    matches!(
        (from, to),
        (SaleStatus::Pending, SaleStatus::Completed)
            | (SaleStatus::Pending, SaleStatus::Cancelled)
            | (SaleStatus::Pending, SaleStatus::Refunded)
            | (SaleStatus::Completed, SaleStatus::Cancelled)
            | (SaleStatus::Completed, SaleStatus::Refunded)
    )
}

/// Validates `from → to` and returns `to`.
///
/// ## Errors
/// - `TerminalSale` when `from` is cancelled or refunded
/// - `InvalidTransition` for any other missing edge (e.g. completed → pending)
pub fn transition(sale_id: &str, from: SaleStatus, to: SaleStatus) -> CoreResult<SaleStatus> {
    ensure_editable(sale_id, from)?;

    if !can_transition(from, to) {
        return Err(CoreError::InvalidTransition {
            sale_id: sale_id.to_string(),
            from,
            to,
        });
    }
    Ok(to)
}

/// Entering `to` puts every remaining unit back on the shelf.
#[inline]
pub const fn restores_stock(to: SaleStatus) -> bool {
    to.is_terminal()
}

/// Entering `to` requires a non-empty reason.
#[inline]
pub const fn requires_reason(to: SaleStatus) -> bool {
    to.is_terminal()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(
            transition("s", SaleStatus::Pending, SaleStatus::Completed),
            Ok(SaleStatus::Completed)
        );
        for from in [SaleStatus::Pending, SaleStatus::Completed] {
            assert!(transition("s", from, SaleStatus::Cancelled).is_ok());
            assert!(transition("s", from, SaleStatus::Refunded).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [SaleStatus::Cancelled, SaleStatus::Refunded] {
            assert!(ensure_editable("s", from).is_err());
            for to in SaleStatus::ALL {
                assert!(matches!(
                    transition("s", from, to),
                    Err(CoreError::TerminalSale { .. })
                ));
            }
        }
    }

    #[test]
    fn test_no_backwards_or_self_edges() {
        assert!(matches!(
            transition("s", SaleStatus::Completed, SaleStatus::Pending),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            transition("s", SaleStatus::Completed, SaleStatus::Completed),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_events() {
        assert_eq!(SaleEvent::Confirm.target(), SaleStatus::Completed);
        assert!(!SaleEvent::Confirm.requires_reason());
        assert!(SaleEvent::Refund.requires_reason());
        assert!(restores_stock(SaleStatus::Cancelled));
        assert!(!restores_stock(SaleStatus::Completed));
    }
}
