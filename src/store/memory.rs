//! In-memory store collaborator.
//!
//! Tracks which entities are resident, which members are new or
//! soft-deleted, and records every change notification in arrival order.
//! Sets are protected by `parking_lot::RwLock`, so one store can be shared
//! between a cache and several membership lists behind an `Arc`.

use hashbrown::HashSet;
use parking_lot::RwLock;

use crate::collection::ChangeRegion;
use crate::model::{EntityId, EntityRef};
use super::{ChangeSink, MemberLifecycle, ResidencyOracle};

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Relationship {
        entity: EntityRef,
        relationship: String,
    },
    Membership {
        owner: EntityRef,
        relationship: String,
        region: ChangeRegion,
    },
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    resident: RwLock<HashSet<EntityRef>>,
    new_members: RwLock<HashSet<EntityRef>>,
    deleted: RwLock<HashSet<EntityRef>>,
    events: RwLock<Vec<ChangeEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entity as materialized.
    pub fn materialize(&self, entity: EntityRef) {
        self.resident.write().insert(entity);
    }

    /// Drop an entity from the resident set. Returns true if it was resident.
    pub fn evict(&self, entity: &EntityRef) -> bool {
        self.resident.write().remove(entity)
    }

    /// Record a locally created member; it is also resident.
    pub fn create_local(&self, entity: EntityRef) {
        self.resident.write().insert(entity.clone());
        self.new_members.write().insert(entity);
    }

    /// The authority confirmed a locally created member.
    pub fn acknowledge(&self, entity: &EntityRef) -> bool {
        self.new_members.write().remove(entity)
    }

    pub fn soft_delete(&self, entity: EntityRef) {
        self.deleted.write().insert(entity);
    }

    pub fn undelete(&self, entity: &EntityRef) -> bool {
        self.deleted.write().remove(entity)
    }

    pub fn resident_count(&self) -> usize {
        self.resident.read().len()
    }

    /// Snapshot of recorded notifications.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.read().clone()
    }

    /// Return and clear recorded notifications.
    pub fn take_events(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.write())
    }
}

impl ResidencyOracle for MemoryStore {
    fn is_resident(&self, type_name: &str, id: &EntityId) -> bool {
        self.resident
            .read()
            .contains(&EntityRef::new(type_name, id.clone()))
    }
}

impl MemberLifecycle for MemoryStore {
    fn is_new(&self, member: &EntityRef) -> bool {
        self.new_members.read().contains(member)
    }

    fn is_deleted(&self, member: &EntityRef) -> bool {
        self.deleted.read().contains(member)
    }
}

impl ChangeSink for MemoryStore {
    fn relationship_changed(&self, type_name: &str, id: &EntityId, relationship: &str) {
        self.events.write().push(ChangeEvent::Relationship {
            entity: EntityRef::new(type_name, id.clone()),
            relationship: relationship.to_string(),
        });
    }

    fn membership_changed(&self, owner: &EntityRef, relationship: &str, region: ChangeRegion) {
        self.events.write().push(ChangeEvent::Membership {
            owner: owner.clone(),
            relationship: relationship.to_string(),
            region,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residency() {
        let store = MemoryStore::new();
        let p1 = EntityRef::new("purpose", "1");
        assert!(!store.is_resident("purpose", &EntityId::from("1")));

        store.materialize(p1.clone());
        assert!(store.is_resident("purpose", &EntityId::from("1")));
        assert!(!store.is_resident("user", &EntityId::from("1")));

        assert!(store.evict(&p1));
        assert!(!store.evict(&p1));
        assert_eq!(store.resident_count(), 0);
    }

    #[test]
    fn test_lifecycle_flags() {
        let store = MemoryStore::new();
        let c = EntityRef::new("comment", "tmp-1");
        store.create_local(c.clone());
        assert!(store.is_new(&c));
        assert!(store.acknowledge(&c));
        assert!(!store.is_new(&c));

        store.soft_delete(c.clone());
        assert!(store.is_deleted(&c));
        assert!(store.undelete(&c));
        assert!(!store.is_deleted(&c));
    }

    #[test]
    fn test_events_are_recorded_in_order() {
        let store = MemoryStore::new();
        let owner = EntityRef::new("post", "1");
        store.relationship_changed("post", &EntityId::from("1"), "comments");
        store.membership_changed(&owner, "comments", ChangeRegion::new(0, 0, 2));

        let events = store.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ChangeEvent::Relationship { relationship, .. } if relationship == "comments"));
        assert!(matches!(&events[1], ChangeEvent::Membership { region, .. } if region.added == 2));
        assert!(store.events().is_empty());
    }
}
