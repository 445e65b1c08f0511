//! Relationship and type descriptors handed out by a schema resolver.

use serde::{Deserialize, Serialize};

/// Multiplicity of one relationship side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Single-valued (`belongsTo`).
    BelongsTo,
    /// Ordered multi-valued (`hasMany`).
    HasMany,
}

/// How the inverse of a relationship is declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InverseSpec {
    /// Look for the single relationship on the related type that points back.
    Infer,
    /// Explicitly named relationship on the related type.
    Named(String),
    /// No inverse.
    None,
}

impl InverseSpec {
    pub fn named(name: impl Into<String>) -> Self {
        InverseSpec::Named(name.into())
    }
}

/// One named relationship on an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub owner_type: String,
    pub name: String,
    pub kind: RelationshipKind,
    /// The related type (the type on the inverse side).
    pub inverse_type: String,
    /// Resolved inverse relationship name, if any.
    pub inverse_name: Option<String>,
}

impl RelationshipDescriptor {
    pub fn is_many(&self) -> bool {
        self.kind == RelationshipKind::HasMany
    }
}

/// An entity type and its relationships, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl TypeDescriptor {
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationship(name).is_some()
    }
}
