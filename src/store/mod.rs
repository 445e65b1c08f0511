//! # Store Collaborator Traits
//!
//! The payload cache and the membership reconciler never own entities. They
//! ask the surrounding store three kinds of question:
//!
//! | Trait | Used by | Question |
//! |-------|---------|----------|
//! | `ResidencyOracle` | `RelationshipPair::unload` | is this entity materialized? |
//! | `MemberLifecycle` | `MembershipList::flush_canonical` | is this member new / soft-deleted? |
//! | `ChangeSink` | flush, unload, membership edits | something changed, tell observers |
//!
//! `MemoryStore` implements all three for tests and embedding.

pub mod memory;

use crate::collection::ChangeRegion;
use crate::model::{EntityId, EntityRef};

pub use memory::{ChangeEvent, MemoryStore};

/// Reports whether an entity is currently resident in the owning graph.
pub trait ResidencyOracle: Send + Sync {
    fn is_resident(&self, type_name: &str, id: &EntityId) -> bool;
}

/// Local lifecycle flags of to-many members.
pub trait MemberLifecycle {
    /// Created locally and not yet acknowledged by the authority.
    fn is_new(&self, member: &EntityRef) -> bool;

    /// Deleted locally; excluded from canonical membership.
    fn is_deleted(&self, member: &EntityRef) -> bool {
        let _ = member;
        false
    }
}

/// Receives change notifications. Both callbacks default to no-ops.
pub trait ChangeSink: Send + Sync {
    /// An entry of `type_name:id` for `relationship` was altered by a flush
    /// or an unload.
    fn relationship_changed(&self, type_name: &str, id: &EntityId, relationship: &str) {
        let _ = (type_name, id, relationship);
    }

    /// A membership list of `owner` was spliced.
    fn membership_changed(&self, owner: &EntityRef, relationship: &str, region: ChangeRegion) {
        let _ = (owner, relationship, region);
    }
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {}

/// Oracle for callers that keep nothing materialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingResident;

impl ResidencyOracle for NothingResident {
    fn is_resident(&self, _type_name: &str, _id: &EntityId) -> bool {
        false
    }
}
