//! # Ordered Collection Reconciler
//!
//! Minimal-diff resync of to-many memberships. `diff` computes the single
//! contiguous edit between two sequences, `reconcile` builds the resync
//! target (canonical members plus unacknowledged local ones), and
//! `MembershipList` applies both to a live list and reports each splice.

pub mod diff;
pub mod reconcile;
pub mod membership;

pub use diff::{change_region, ChangeRegion};
pub use reconcile::{reconcile, Reconciliation};
pub use membership::MembershipList;
