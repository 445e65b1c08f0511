//! # Relationship Payload Model
//!
//! Plain data that crosses every boundary: transport ↔ cache ↔ reconciler.
//!
//! Design rule: this module is pure data. No locks, no collaborators, no
//! side effects beyond payload validation.

pub mod entity;
pub mod payload;
pub mod descriptor;

pub use entity::{EntityId, EntityRef};
pub use payload::{PayloadEntry, PayloadValue, RelationshipPayload};
pub use descriptor::{InverseSpec, RelationshipDescriptor, RelationshipKind, TypeDescriptor};
