//! Payloads for both sides of one relationship, across all entities.
//!
//! Pushes are queued; nothing touches the side maps until a `get`, `flush`
//! or `unload` drains the queue. Draining applies each push in order:
//!
//! ```text
//! previous = own[id]
//! inverse  -= back-references established by previous
//! own[id]   = { payload, is_inverse: false }
//! inverse  += { data: type:id, is_inverse: true } for every ref in payload
//! ```
//!
//! The two maps refer to each other only through ids. For a relationship
//! that is its own inverse both sides share one map.
//!
//! ## Locking
//!
//! The pending queue's mutex is held for the whole drain plus the read (or
//! unload) that triggered it, so callers never observe a half-applied flush.
//! Each step locks a single side map, so an aliased map cannot deadlock.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

use crate::model::*;
use crate::store::{ChangeSink, ResidencyOracle};
use super::key::SideKey;

/// Entries of one side, by entity id.
pub type PayloadMap = HashMap<EntityId, PayloadEntry>;

type SharedPayloads = Arc<RwLock<PayloadMap>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Lhs,
    Rhs,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Lhs => Side::Rhs,
            Side::Rhs => Side::Lhs,
        }
    }
}

/// Whether pushes are waiting to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Clean,
    Dirty,
}

#[derive(Debug)]
struct PendingPush {
    side: Side,
    id: EntityId,
    payload: RelationshipPayload,
}

// ============================================================================
// RelationshipPair
// ============================================================================

#[derive(Debug)]
pub struct RelationshipPair {
    lhs_key: SideKey,
    rhs_key: SideKey,
    lhs: SharedPayloads,
    rhs: SharedPayloads,
    pending: Mutex<VecDeque<PendingPush>>,
    dedupe_inverse_refs: bool,
}

impl RelationshipPair {
    pub fn new(lhs_key: SideKey, rhs_key: SideKey, dedupe_inverse_refs: bool) -> Self {
        let lhs: SharedPayloads = Arc::new(RwLock::new(PayloadMap::new()));
        let rhs = if lhs_key == rhs_key {
            Arc::clone(&lhs)
        } else {
            Arc::new(RwLock::new(PayloadMap::new()))
        };

        Self {
            lhs_key,
            rhs_key,
            lhs,
            rhs,
            pending: Mutex::new(VecDeque::new()),
            dedupe_inverse_refs,
        }
    }

    pub fn keys(&self) -> (&SideKey, &SideKey) {
        (&self.lhs_key, &self.rhs_key)
    }

    pub fn key(&self, side: Side) -> &SideKey {
        match side {
            Side::Lhs => &self.lhs_key,
            Side::Rhs => &self.rhs_key,
        }
    }

    /// Which side `type_name:relationship` is on, if either.
    pub fn side_of(&self, type_name: &str, relationship: &str) -> Option<Side> {
        if self.lhs_key.matches(type_name, relationship) {
            Some(Side::Lhs)
        } else if self.rhs_key.matches(type_name, relationship) {
            Some(Side::Rhs)
        } else {
            None
        }
    }

    /// Both sides share one map.
    pub fn is_reflexive(&self) -> bool {
        Arc::ptr_eq(&self.lhs, &self.rhs)
    }

    fn payloads(&self, side: Side) -> &SharedPayloads {
        match side {
            Side::Lhs => &self.lhs,
            Side::Rhs => &self.rhs,
        }
    }

    pub fn state(&self) -> FlushState {
        if self.pending.lock().is_empty() {
            FlushState::Clean
        } else {
            FlushState::Dirty
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Ids with an entry on `side`, sorted, read without flushing.
    pub fn loaded_ids(&self, side: Side) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.payloads(side).read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Queue a payload for `side`'s entity `id`. O(1), no map mutation.
    pub fn push(&self, side: Side, id: EntityId, payload: RelationshipPayload) {
        tracing::trace!(side = %self.key(side), %id, "queued relationship payload");
        self.pending.lock().push_back(PendingPush { side, id, payload });
    }

    /// Flush, then read `side`'s entry for `id`.
    pub fn get(&self, side: Side, id: &EntityId, sink: &dyn ChangeSink) -> Option<PayloadEntry> {
        let mut pending = self.pending.lock();
        let mut log = ChangeLog::new(self.is_reflexive());
        self.flush_locked(&mut pending, &mut log);

        let entry = self.payloads(side).read().get(id).cloned();
        let changed = log.resolve(self);
        drop(pending);

        self.notify(&changed, sink);
        entry
    }

    /// Apply every queued push.
    pub fn flush(&self, sink: &dyn ChangeSink) {
        let mut pending = self.pending.lock();
        let mut log = ChangeLog::new(self.is_reflexive());
        self.flush_locked(&mut pending, &mut log);
        let changed = log.resolve(self);
        drop(pending);

        self.notify(&changed, sink);
    }

    /// Flush, then drop `side`'s entry for `id` and its back-references,
    /// unless an entity it references is still resident.
    ///
    /// Returns whether an entry was removed.
    pub fn unload(
        &self,
        side: Side,
        id: &EntityId,
        residency: &dyn ResidencyOracle,
        sink: &dyn ChangeSink,
    ) -> bool {
        let mut pending = self.pending.lock();
        let mut log = ChangeLog::new(self.is_reflexive());
        self.flush_locked(&mut pending, &mut log);

        let entry = self.payloads(side).read().get(id).cloned();
        let removed = match entry {
            Some(entry) if !Self::inverse_loaded(&entry, residency) => {
                {
                    let mut own = self.payloads(side).write();
                    log.touch(side, id, &own);
                    own.remove(id);
                }
                let inverse_side = side.other();
                let mut inverse = self.payloads(inverse_side).write();
                self.remove_inverse(id, entry.data(), &mut inverse, inverse_side, &mut log);
                true
            }
            Some(_) => {
                tracing::debug!(side = %self.key(side), %id, "unload skipped, inverse still resident");
                false
            }
            None => false,
        };

        let changed = log.resolve(self);
        drop(pending);

        self.notify(&changed, sink);
        removed
    }

    // ========================================================================
    // Flush internals
    // ========================================================================

    fn flush_locked(&self, pending: &mut VecDeque<PendingPush>, log: &mut ChangeLog) {
        if pending.is_empty() {
            return;
        }
        let count = pending.len();
        for push in pending.drain(..) {
            self.apply(push, log);
        }
        tracing::debug!(
            lhs = %self.lhs_key,
            rhs = %self.rhs_key,
            applied = count,
            touched = log.len(),
            "flushed relationship payloads"
        );
    }

    fn apply(&self, push: PendingPush, log: &mut ChangeLog) {
        let PendingPush { side, id, payload } = push;
        let inverse_side = side.other();
        let back_ref = EntityRef::new(self.key(side).type_name.clone(), id.clone());

        let previous = self.payloads(side).read().get(&id).cloned();
        if let Some(previous) = &previous {
            let mut inverse = self.payloads(inverse_side).write();
            self.remove_inverse(&id, previous.data(), &mut inverse, inverse_side, log);
        }

        let entry = PayloadEntry::direct(payload);
        {
            let mut own = self.payloads(side).write();
            log.touch(side, &id, &own);
            own.insert(id, entry.clone());
        }

        let mut inverse = self.payloads(inverse_side).write();
        self.populate_inverse(entry.data(), &back_ref, &mut inverse, inverse_side, log);
    }

    fn populate_inverse(
        &self,
        data: &PayloadValue,
        back_ref: &EntityRef,
        inverse: &mut PayloadMap,
        inverse_side: Side,
        log: &mut ChangeLog,
    ) {
        for target in data.refs() {
            self.add_to_inverse(back_ref, &target.id, inverse, inverse_side, log);
        }
    }

    /// Append to a multi-valued inverse entry, otherwise overwrite it with a
    /// single back-reference.
    fn add_to_inverse(
        &self,
        back_ref: &EntityRef,
        target_id: &EntityId,
        inverse: &mut PayloadMap,
        inverse_side: Side,
        log: &mut ChangeLog,
    ) {
        log.touch(inverse_side, target_id, inverse);

        if let Some(PayloadValue::Many(refs)) = inverse.get_mut(target_id).map(|e| &mut e.payload.data) {
            if !(self.dedupe_inverse_refs && refs.iter().any(|r| r.id == back_ref.id)) {
                refs.push(back_ref.clone());
            }
            return;
        }
        inverse.insert(target_id.clone(), PayloadEntry::inverse(back_ref.clone()));
    }

    fn remove_inverse(
        &self,
        owner_id: &EntityId,
        previous: &PayloadValue,
        inverse: &mut PayloadMap,
        inverse_side: Side,
        log: &mut ChangeLog,
    ) {
        for target in previous.refs() {
            Self::remove_from_inverse(owner_id, &target.id, inverse, inverse_side, log);
        }
    }

    /// Drop `owner_id` from a multi-valued target entry; reset a
    /// single-valued one to an inverse `null`.
    fn remove_from_inverse(
        owner_id: &EntityId,
        target_id: &EntityId,
        inverse: &mut PayloadMap,
        inverse_side: Side,
        log: &mut ChangeLog,
    ) {
        let is_many = match inverse.get(target_id).map(PayloadEntry::data) {
            None | Some(PayloadValue::Null) => return,
            Some(data) => data.is_many(),
        };
        log.touch(inverse_side, target_id, inverse);

        if is_many {
            if let Some(PayloadValue::Many(refs)) = inverse.get_mut(target_id).map(|e| &mut e.payload.data) {
                refs.retain(|r| &r.id != owner_id);
            }
        } else {
            inverse.insert(target_id.clone(), PayloadEntry::inverse(PayloadValue::Null));
        }
    }

    /// Any entity referenced by `entry` is resident.
    fn inverse_loaded(entry: &PayloadEntry, residency: &dyn ResidencyOracle) -> bool {
        entry
            .data()
            .refs()
            .iter()
            .any(|r| residency.is_resident(&r.type_name, &r.id))
    }

    fn notify(&self, changed: &[(Side, EntityId)], sink: &dyn ChangeSink) {
        for (side, id) in changed {
            let key = self.key(*side);
            if key.is_unbound() {
                continue;
            }
            sink.relationship_changed(&key.type_name, id, &key.relationship);
        }
    }
}

// ============================================================================
// ChangeLog
// ============================================================================

/// First-touch snapshots of every entry a flush or unload may alter.
///
/// Entries whose final value equals the snapshot are not reported.
#[derive(Debug)]
struct ChangeLog {
    reflexive: bool,
    seen: HashSet<(Side, EntityId)>,
    before: Vec<(Side, EntityId, Option<PayloadEntry>)>,
}

impl ChangeLog {
    fn new(reflexive: bool) -> Self {
        Self {
            reflexive,
            seen: HashSet::new(),
            before: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.before.len()
    }

    fn touch(&mut self, side: Side, id: &EntityId, map: &PayloadMap) {
        // Aliased sides are one map; report them once.
        let side = if self.reflexive { Side::Lhs } else { side };
        if self.seen.insert((side, id.clone())) {
            self.before.push((side, id.clone(), map.get(id).cloned()));
        }
    }

    fn resolve(self, pair: &RelationshipPair) -> Vec<(Side, EntityId)> {
        self.before
            .into_iter()
            .filter(|(side, id, before)| pair.payloads(*side).read().get(id) != before.as_ref())
            .map(|(side, id, _)| (side, id))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
