//! Canonical resync of a live ordered membership.

use super::diff::{change_region, ChangeRegion};

/// Outcome of a resync: the new live members and the edit that produced
/// them from the old ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<T> {
    pub members: Vec<T>,
    pub change: Option<ChangeRegion>,
}

/// Resync `current` against `canonical`.
///
/// The target is `canonical` followed by every member of `current` for which
/// `is_local` holds and which `canonical` does not already contain, in
/// `current`'s order. Unacknowledged local members therefore survive a
/// resync. `canonical` must already exclude soft-deleted members.
pub fn reconcile<T, F>(current: &[T], canonical: &[T], is_local: F) -> Reconciliation<T>
where
    T: PartialEq + Clone,
    F: Fn(&T) -> bool,
{
    let mut target = canonical.to_vec();
    target.extend(
        current
            .iter()
            .filter(|m| is_local(m) && !canonical.contains(m))
            .cloned(),
    );

    let change = change_region(current, &target);
    let mut members = current.to_vec();
    if let Some(region) = change {
        region.apply(&mut members, &target);
    }

    Reconciliation { members, change }
}
