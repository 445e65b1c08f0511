//! # relcache-rs — Bidirectional Relationship Payload Cache
//!
//! Keeps both sides of every relationship between two entity types
//! consistent without materializing the entities, and resyncs live to-many
//! memberships against their canonical version with a single minimal splice.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: schema, residency and change notification are
//!    collaborator traits; the cache owns none of them
//! 2. **Lazy inverses**: `push` only queues; the first `get` on a pair
//!    applies every queued push and synthesizes back-references
//! 3. **Ids, not pointers**: the two side maps of a pair refer to each other
//!    only by entity id
//! 4. **One region per resync**: observers see the smallest contiguous edit
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use relcache::{InverseSpec, MemorySchema, MemoryStore, PayloadValue, RelationshipPayloadCache};
//!
//! # fn main() -> relcache::Result<()> {
//! let schema = MemorySchema::builder()
//!     .belongs_to("user", "purpose", "purpose", InverseSpec::named("user"))
//!     .belongs_to("purpose", "user", "user", InverseSpec::named("purpose"))
//!     .build()?;
//! let store = Arc::new(MemoryStore::new());
//! let cache = RelationshipPayloadCache::new(Arc::new(schema), store.clone());
//!
//! cache.push("user", 1u64, &serde_json::json!({
//!     "purpose": { "data": { "type": "purpose", "id": 2 } }
//! }))?;
//! cache.push("purpose", 2u64, &serde_json::json!({ "user": { "data": null } }))?;
//!
//! let entry = cache.get("user", 1u64, "purpose")?.unwrap();
//! assert!(entry.is_inverse);
//! assert_eq!(entry.data(), &PayloadValue::Null);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `model` | entity refs, payloads, descriptors |
//! | `schema` | `SchemaResolver` trait and `MemorySchema` |
//! | `store` | residency / lifecycle / change-sink traits and `MemoryStore` |
//! | `payloads` | `RelationshipPayloadCache` and `RelationshipPair` |
//! | `collection` | minimal-diff reconciler and `MembershipList` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod store;
pub mod payloads;
pub mod collection;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    EntityId, EntityRef, PayloadEntry, PayloadValue, RelationshipPayload,
    InverseSpec, RelationshipDescriptor, RelationshipKind, TypeDescriptor,
};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use schema::{SchemaResolver, MemorySchema, MemorySchemaBuilder};
pub use store::{
    ChangeSink, MemberLifecycle, ResidencyOracle,
    NullSink, NothingResident, MemoryStore, ChangeEvent,
};

// ============================================================================
// Re-exports: Cache
// ============================================================================

pub use payloads::{
    RelationshipPayloadCache, CacheConfig,
    RelationshipPair, Side, SideKey, FlushState,
};

// ============================================================================
// Re-exports: Reconciler
// ============================================================================

pub use collection::{
    reconcile, change_region, ChangeRegion, Reconciliation, MembershipList,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Invalid payload shape for '{relationship}': {message}")]
    InvalidPayloadShape { relationship: String, message: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
