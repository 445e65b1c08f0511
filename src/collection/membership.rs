//! Live to-many membership of one owner's relationship.
//!
//! Holds the `current` members observers see and the `canonical` members the
//! authority last confirmed. Every structural edit is reported to a
//! `ChangeSink` as a single `ChangeRegion`.

use crate::model::{EntityRef, PayloadEntry};
use crate::store::{ChangeSink, MemberLifecycle};
use super::diff::ChangeRegion;
use super::reconcile::reconcile;

#[derive(Debug, Clone)]
pub struct MembershipList {
    owner: EntityRef,
    relationship: String,
    current: Vec<EntityRef>,
    canonical: Vec<EntityRef>,
    meta: Option<serde_json::Value>,
}

impl MembershipList {
    pub fn new(owner: EntityRef, relationship: impl Into<String>) -> Self {
        Self {
            owner,
            relationship: relationship.into(),
            current: Vec::new(),
            canonical: Vec::new(),
            meta: None,
        }
    }

    pub fn owner(&self) -> &EntityRef {
        &self.owner
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Member at `index`; out-of-bounds reads are `None`, not a panic.
    pub fn get(&self, index: usize) -> Option<&EntityRef> {
        self.current.get(index)
    }

    pub fn members(&self) -> &[EntityRef] {
        &self.current
    }

    pub fn canonical(&self) -> &[EntityRef] {
        &self.canonical
    }

    /// `meta` of the payload the canonical members were loaded from.
    pub fn meta(&self) -> Option<&serde_json::Value> {
        self.meta.as_ref()
    }

    pub fn set_canonical(&mut self, members: Vec<EntityRef>) {
        self.canonical = members;
    }

    /// Take canonical members and `meta` from a cached payload entry.
    pub fn load_canonical(&mut self, entry: &PayloadEntry) {
        self.canonical = entry.data().refs().to_vec();
        self.meta = entry.payload.meta.clone();
    }

    /// Resync `current` against `canonical` with a minimal splice.
    ///
    /// Soft-deleted canonical members are dropped; new local members that
    /// the authority has not listed yet are kept at the end.
    pub fn flush_canonical(
        &mut self,
        lifecycle: &dyn MemberLifecycle,
        sink: &dyn ChangeSink,
    ) -> Option<ChangeRegion> {
        let canonical: Vec<EntityRef> = self
            .canonical
            .iter()
            .filter(|m| !lifecycle.is_deleted(m))
            .cloned()
            .collect();

        let out = reconcile(&self.current, &canonical, |m| lifecycle.is_new(m));
        let region = out.change?;
        self.current = out.members;

        tracing::debug!(
            owner = %self.owner,
            relationship = %self.relationship,
            start = region.start,
            removed = region.removed,
            added = region.added,
            "membership resynced"
        );
        sink.membership_changed(&self.owner, &self.relationship, region);
        Some(region)
    }

    /// Replace `remove` members at `index` with `members`.
    ///
    /// `index` and `remove` are clamped to the current length. Returns the
    /// applied region, or `None` if nothing changed.
    pub fn replace(
        &mut self,
        index: usize,
        remove: usize,
        members: Vec<EntityRef>,
        sink: &dyn ChangeSink,
    ) -> Option<ChangeRegion> {
        let start = index.min(self.current.len());
        let removed = remove.min(self.current.len() - start);
        let region = ChangeRegion::new(start, removed, members.len());
        if region.is_empty() {
            return None;
        }

        self.current.splice(start..start + removed, members);
        sink.membership_changed(&self.owner, &self.relationship, region);
        Some(region)
    }

    /// Insert `members` at `index`, or append when `index` is `None`.
    pub fn add_members(
        &mut self,
        members: Vec<EntityRef>,
        index: Option<usize>,
        sink: &dyn ChangeSink,
    ) -> Option<ChangeRegion> {
        let index = index.unwrap_or(self.current.len());
        self.replace(index, 0, members, sink)
    }

    /// Remove each listed member that is present. Returns how many were
    /// removed.
    pub fn remove_members(&mut self, members: &[EntityRef], sink: &dyn ChangeSink) -> usize {
        let mut removed = 0;
        for member in members {
            if let Some(index) = self.current.iter().position(|m| m == member) {
                self.replace(index, 1, Vec::new(), sink);
                removed += 1;
            }
        }
        removed
    }
}
