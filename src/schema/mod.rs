//! # Schema Resolver Trait
//!
//! The contract between the payload cache and whatever owns the entity
//! schema. The cache never introspects types itself; it asks a resolver.
//!
//! ## Implementations
//!
//! | Resolver | Module | Description |
//! |----------|--------|-------------|
//! | `MemorySchema` | `memory` | Declared up front, inverses inferred at build time |

pub mod memory;

use crate::model::{RelationshipDescriptor, TypeDescriptor};
use crate::Result;

pub use memory::{MemorySchema, MemorySchemaBuilder};

/// Resolves entity types and their relationship descriptors.
pub trait SchemaResolver: Send + Sync {
    /// Look up a type by name.
    ///
    /// Fails with `Error::UnknownEntityType` when the type is not declared.
    fn resolve_type(&self, name: &str) -> Result<&TypeDescriptor>;

    /// All relationships declared on `ty`.
    fn relationship_descriptors<'a>(&self, ty: &'a TypeDescriptor) -> &'a [RelationshipDescriptor] {
        &ty.relationships
    }

    /// The descriptor on the related type that is the inverse of
    /// `ty.relationship`, or `None` when the relationship is one-way or
    /// unknown.
    fn inverse_of(&self, ty: &TypeDescriptor, relationship: &str) -> Option<RelationshipDescriptor> {
        let rel = ty.relationship(relationship)?;
        let inverse_name = rel.inverse_name.as_deref()?;
        let inverse_ty = self.resolve_type(&rel.inverse_type).ok()?;
        inverse_ty.relationship(inverse_name).cloned()
    }
}
