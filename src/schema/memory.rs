//! In-memory schema resolver.
//!
//! Types and relationships are declared on a builder, then `build()` checks
//! that every related type exists and resolves each inverse.
//!
//! ## Inverse resolution
//!
//! - `InverseSpec::Named(n)`: the related type must declare `n`, pointing back
//!   at the owner type, and must not name a different inverse itself.
//! - `InverseSpec::Infer`: the related type's relationships that point back at
//!   the owner (and do not explicitly name some other relationship) are the
//!   candidates. Exactly one candidate becomes the inverse, zero means no
//!   inverse, more than one is ambiguous and rejected.
//! - `InverseSpec::None`: one-way relationship.

use hashbrown::HashMap;

use crate::model::*;
use crate::{Error, Result};
use super::SchemaResolver;

// ============================================================================
// MemorySchema
// ============================================================================

/// Immutable, fully resolved schema.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    types: HashMap<String, TypeDescriptor>,
}

impl MemorySchema {
    pub fn builder() -> MemorySchemaBuilder {
        MemorySchemaBuilder::default()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl SchemaResolver for MemorySchema {
    fn resolve_type(&self, name: &str) -> Result<&TypeDescriptor> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownEntityType(name.to_string()))
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone)]
struct DeclaredRelationship {
    name: String,
    kind: RelationshipKind,
    related: String,
    inverse: InverseSpec,
}

/// Collects declarations; nothing is validated until `build()`.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaBuilder {
    /// Declaration order is kept so unload walks relationships predictably.
    order: Vec<String>,
    declared: HashMap<String, Vec<DeclaredRelationship>>,
}

impl MemorySchemaBuilder {
    /// Declare a type, even one that owns no relationships.
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.declare(name.into());
        self
    }

    pub fn belongs_to(
        self,
        owner: impl Into<String>,
        name: impl Into<String>,
        related: impl Into<String>,
        inverse: InverseSpec,
    ) -> Self {
        self.relationship(owner, name, RelationshipKind::BelongsTo, related, inverse)
    }

    pub fn has_many(
        self,
        owner: impl Into<String>,
        name: impl Into<String>,
        related: impl Into<String>,
        inverse: InverseSpec,
    ) -> Self {
        self.relationship(owner, name, RelationshipKind::HasMany, related, inverse)
    }

    pub fn relationship(
        mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        kind: RelationshipKind,
        related: impl Into<String>,
        inverse: InverseSpec,
    ) -> Self {
        let owner = owner.into();
        self.declare(owner.clone());
        if let Some(rels) = self.declared.get_mut(&owner) {
            rels.push(DeclaredRelationship {
                name: name.into(),
                kind,
                related: related.into(),
                inverse,
            });
        }
        self
    }

    fn declare(&mut self, name: String) {
        if !self.declared.contains_key(&name) {
            self.order.push(name.clone());
            self.declared.insert(name, Vec::new());
        }
    }

    /// Validate declarations and resolve every inverse.
    pub fn build(self) -> Result<MemorySchema> {
        let mut types = HashMap::with_capacity(self.order.len());

        for owner in &self.order {
            let rels = &self.declared[owner];
            let mut resolved = Vec::with_capacity(rels.len());

            for (i, rel) in rels.iter().enumerate() {
                if rels[..i].iter().any(|r| r.name == rel.name) {
                    return Err(Error::SchemaError(format!(
                        "relationship '{}' declared twice on '{owner}'",
                        rel.name
                    )));
                }
                if !self.declared.contains_key(&rel.related) {
                    return Err(Error::SchemaError(format!(
                        "'{owner}.{}' points at undeclared type '{}'",
                        rel.name, rel.related
                    )));
                }
                resolved.push(RelationshipDescriptor {
                    owner_type: owner.clone(),
                    name: rel.name.clone(),
                    kind: rel.kind,
                    inverse_type: rel.related.clone(),
                    inverse_name: self.resolve_inverse(owner, rel)?,
                });
            }

            types.insert(
                owner.clone(),
                TypeDescriptor {
                    name: owner.clone(),
                    relationships: resolved,
                },
            );
        }

        Ok(MemorySchema { types })
    }

    fn resolve_inverse(&self, owner: &str, rel: &DeclaredRelationship) -> Result<Option<String>> {
        let related = &self.declared[&rel.related];

        match &rel.inverse {
            InverseSpec::None => Ok(None),
            InverseSpec::Named(name) => {
                let target = related.iter().find(|r| &r.name == name).ok_or_else(|| {
                    Error::SchemaError(format!(
                        "inverse '{}.{name}' of '{owner}.{}' is not declared",
                        rel.related, rel.name
                    ))
                })?;
                if target.related != owner {
                    return Err(Error::SchemaError(format!(
                        "inverse '{}.{name}' points at '{}', not '{owner}'",
                        rel.related, target.related
                    )));
                }
                match &target.inverse {
                    InverseSpec::Named(back) if back != &rel.name => Err(Error::SchemaError(format!(
                        "'{}.{name}' names '{back}' as its inverse, not '{}'",
                        rel.related, rel.name
                    ))),
                    InverseSpec::None => Err(Error::SchemaError(format!(
                        "'{}.{name}' is declared without an inverse but '{owner}.{}' names it",
                        rel.related, rel.name
                    ))),
                    _ => Ok(Some(name.clone())),
                }
            }
            InverseSpec::Infer => {
                let candidates: Vec<&DeclaredRelationship> = related
                    .iter()
                    .filter(|r| r.related == owner)
                    .filter(|r| match &r.inverse {
                        InverseSpec::Infer => true,
                        InverseSpec::Named(back) => back == &rel.name,
                        InverseSpec::None => false,
                    })
                    .collect();
                match candidates.as_slice() {
                    [] => Ok(None),
                    [only] => Ok(Some(only.name.clone())),
                    many => Err(Error::SchemaError(format!(
                        "ambiguous inverse for '{owner}.{}': {} candidates on '{}'",
                        rel.name,
                        many.len(),
                        rel.related
                    ))),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> MemorySchema {
        MemorySchema::builder()
            .belongs_to("user", "purpose", "purpose", InverseSpec::named("user"))
            .has_many("user", "hobbies", "hobby", InverseSpec::named("user"))
            .has_many("user", "friends", "user", InverseSpec::named("friends"))
            .belongs_to("hobby", "user", "user", InverseSpec::named("hobbies"))
            .belongs_to("purpose", "user", "user", InverseSpec::named("purpose"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_known_and_unknown_types() {
        let schema = user_schema();
        assert_eq!(schema.resolve_type("user").unwrap().relationships.len(), 3);
        let err = schema.resolve_type("fish").unwrap_err();
        assert!(matches!(err, Error::UnknownEntityType(ref t) if t == "fish"));
    }

    #[test]
    fn test_inverse_of_named() {
        let schema = user_schema();
        let user = schema.resolve_type("user").unwrap();
        let inverse = schema.inverse_of(user, "hobbies").unwrap();
        assert_eq!(inverse.owner_type, "hobby");
        assert_eq!(inverse.name, "user");
        assert_eq!(inverse.kind, RelationshipKind::BelongsTo);

        let friends = schema.inverse_of(user, "friends").unwrap();
        assert_eq!((friends.owner_type.as_str(), friends.name.as_str()), ("user", "friends"));
        assert!(schema.inverse_of(user, "potatoes").is_none());
    }

    #[test]
    fn test_relationship_order_is_declaration_order() {
        let schema = user_schema();
        let user = schema.resolve_type("user").unwrap();
        let names: Vec<&str> = schema
            .relationship_descriptors(user)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["purpose", "hobbies", "friends"]);
    }

    #[test]
    fn test_infer_single_candidate() {
        let schema = MemorySchema::builder()
            .has_many("post", "comments", "comment", InverseSpec::Infer)
            .belongs_to("comment", "post", "post", InverseSpec::Infer)
            .build()
            .unwrap();
        let post = schema.resolve_type("post").unwrap();
        assert_eq!(post.relationship("comments").unwrap().inverse_name.as_deref(), Some("post"));
        let comment = schema.resolve_type("comment").unwrap();
        assert_eq!(comment.relationship("post").unwrap().inverse_name.as_deref(), Some("comments"));
    }

    #[test]
    fn test_infer_without_candidate_is_one_way() {
        let schema = MemorySchema::builder()
            .belongs_to("comment", "author", "user", InverseSpec::Infer)
            .entity("user")
            .build()
            .unwrap();
        let comment = schema.resolve_type("comment").unwrap();
        assert_eq!(comment.relationship("author").unwrap().inverse_name, None);
        assert!(schema.inverse_of(comment, "author").is_none());
    }

    #[test]
    fn test_infer_ambiguous_is_rejected() {
        let err = MemorySchema::builder()
            .belongs_to("comment", "post", "post", InverseSpec::Infer)
            .has_many("post", "comments", "comment", InverseSpec::Infer)
            .has_many("post", "pinned", "comment", InverseSpec::Infer)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaError(_)));
    }

    #[test]
    fn test_undeclared_related_type_is_rejected() {
        let err = MemorySchema::builder()
            .belongs_to("comment", "post", "post", InverseSpec::None)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaError(ref m) if m.contains("undeclared")));
    }

    #[test]
    fn test_mismatched_named_inverse_is_rejected() {
        let err = MemorySchema::builder()
            .has_many("user", "hobbies", "hobby", InverseSpec::named("owner"))
            .belongs_to("hobby", "owner", "user", InverseSpec::named("favourites"))
            .has_many("user", "favourites", "hobby", InverseSpec::named("owner"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaError(_)));
    }

    #[test]
    fn test_duplicate_relationship_is_rejected() {
        let err = MemorySchema::builder()
            .entity("hobby")
            .has_many("user", "hobbies", "hobby", InverseSpec::None)
            .has_many("user", "hobbies", "hobby", InverseSpec::None)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::SchemaError(ref m) if m.contains("twice")));
    }
}
