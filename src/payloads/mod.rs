//! # Relationship Payload Cache
//!
//! Single source of truth for relationship payloads across both sides of
//! every relationship. Pushing `user:1 → hobbies: [hobby:2]` makes
//! `hobby:2 → user` discoverable without materializing either entity:
//!
//! ```rust
//! use std::sync::Arc;
//! use relcache::{EntityRef, InverseSpec, MemorySchema, MemoryStore, RelationshipPayloadCache};
//!
//! # fn main() -> relcache::Result<()> {
//! let schema = MemorySchema::builder()
//!     .has_many("user", "hobbies", "hobby", InverseSpec::named("user"))
//!     .belongs_to("hobby", "user", "user", InverseSpec::named("hobbies"))
//!     .build()?;
//! let cache = RelationshipPayloadCache::new(Arc::new(schema), Arc::new(MemoryStore::new()));
//!
//! cache.push("user", "1", &serde_json::json!({
//!     "hobbies": { "data": [{ "type": "hobby", "id": "2" }] }
//! }))?;
//!
//! let entry = cache.get("hobby", "2", "user")?.unwrap();
//! assert!(entry.is_inverse);
//! assert_eq!(entry.data().refs(), &[EntityRef::new("user", "1")]);
//! # Ok(())
//! # }
//! ```
//!
//! Each relationship and its inverse share one `RelationshipPair`, created on
//! first use and kept for the life of the cache.

pub mod key;
pub mod pair;

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::collection::MembershipList;
use crate::model::*;
use crate::schema::SchemaResolver;
use crate::store::{ChangeSink, NullSink, ResidencyOracle};
use crate::{Error, Result};

pub use key::{pair_key, PairKey, SideKey};
pub use pair::{FlushState, PayloadMap, RelationshipPair, Side};

// ============================================================================
// Configuration
// ============================================================================

/// Cache behaviour knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Skip appending a back-reference to a multi-valued inverse entry that
    /// already lists the same id. Off by default: inverse entries append
    /// unconditionally.
    pub dedupe_inverse_refs: bool,
}

impl CacheConfig {
    /// Parse a JSON config document; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

// ============================================================================
// RelationshipPayloadCache
// ============================================================================

pub struct RelationshipPayloadCache {
    schema: Arc<dyn SchemaResolver>,
    residency: Arc<dyn ResidencyOracle>,
    sink: Arc<dyn ChangeSink>,
    config: CacheConfig,
    pairs: RwLock<HashMap<PairKey, Arc<RelationshipPair>>>,
}

impl RelationshipPayloadCache {
    pub fn new(schema: Arc<dyn SchemaResolver>, residency: Arc<dyn ResidencyOracle>) -> Self {
        Self {
            schema,
            residency,
            sink: Arc::new(NullSink),
            config: CacheConfig::default(),
            pairs: RwLock::new(HashMap::new()),
        }
    }

    /// Route change notifications to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Applies to pairs created after this call.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.read().len()
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// The entry for `type_name:id`'s `relationship`, after flushing its pair.
    ///
    /// Unknown relationships yield `Ok(None)`; unknown types are an error.
    pub fn get(
        &self,
        type_name: &str,
        id: impl Into<EntityId>,
        relationship: &str,
    ) -> Result<Option<PayloadEntry>> {
        let Some((pair, side)) = self.resolve(type_name, relationship)? else {
            return Ok(None);
        };
        Ok(pair.get(side, &id.into(), self.sink.as_ref()))
    }

    /// Refs named by the entry, empty when there is none.
    pub fn canonical_members(
        &self,
        type_name: &str,
        id: impl Into<EntityId>,
        relationship: &str,
    ) -> Result<Vec<EntityRef>> {
        Ok(self
            .get(type_name, id, relationship)?
            .map(|entry| entry.data().refs().to_vec())
            .unwrap_or_default())
    }

    /// Load `list`'s canonical members from this cache.
    ///
    /// Returns false when there is no entry for the list's owner.
    pub fn refresh_canonical(&self, list: &mut MembershipList) -> Result<bool> {
        let owner = list.owner().clone();
        match self.get(&owner.type_name, owner.id, list.relationship())? {
            Some(entry) => {
                list.load_canonical(&entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Push a JSON:API `relationships` object for `type_name:id`.
    ///
    /// Unknown relationship names are skipped. Every known payload is
    /// validated before any is queued, so one malformed payload rejects the
    /// whole push.
    pub fn push(
        &self,
        type_name: &str,
        id: impl Into<EntityId>,
        relationships: &serde_json::Value,
    ) -> Result<()> {
        self.schema.resolve_type(type_name)?;
        let by_name = match relationships {
            serde_json::Value::Null => return Ok(()),
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(Error::InvalidPayloadShape {
                    relationship: "relationships".into(),
                    message: "expected an object keyed by relationship name".into(),
                });
            }
        };

        let mut staged = Vec::with_capacity(by_name.len());
        for (name, raw) in by_name {
            let Some((pair, side)) = self.resolve(type_name, name)? else {
                tracing::trace!(type_name, relationship = %name, "skipping unknown relationship");
                continue;
            };
            staged.push((pair, side, RelationshipPayload::from_json(name, raw)?));
        }

        let id = id.into();
        for (pair, side, payload) in staged {
            pair.push(side, id.clone(), payload);
        }
        Ok(())
    }

    /// Typed form of `push` for payloads that are already parsed.
    pub fn push_payloads<I, S>(&self, type_name: &str, id: impl Into<EntityId>, payloads: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, RelationshipPayload)>,
        S: AsRef<str>,
    {
        self.schema.resolve_type(type_name)?;
        let id = id.into();
        for (name, payload) in payloads {
            if let Some((pair, side)) = self.resolve(type_name, name.as_ref())? {
                pair.push(side, id.clone(), payload);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Unload
    // ========================================================================

    /// Unload every relationship declared on `type_name` for `id`.
    ///
    /// Each entry is dropped only if none of the entities it references is
    /// resident. Returns how many entries were removed.
    pub fn unload(&self, type_name: &str, id: impl Into<EntityId>) -> Result<usize> {
        let id = id.into();
        let ty = self.schema.resolve_type(type_name)?;
        let mut removed = 0;
        for descriptor in self.schema.relationship_descriptors(ty) {
            if self.unload_relationship(type_name, id.clone(), &descriptor.name)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Unload one relationship entry. Returns whether it was removed.
    pub fn unload_relationship(
        &self,
        type_name: &str,
        id: impl Into<EntityId>,
        relationship: &str,
    ) -> Result<bool> {
        let Some((pair, side)) = self.resolve(type_name, relationship)? else {
            return Ok(false);
        };
        Ok(pair.unload(side, &id.into(), self.residency.as_ref(), self.sink.as_ref()))
    }

    // ========================================================================
    // Pair resolution
    // ========================================================================

    /// The pair shared by `type_name.relationship` and its inverse.
    pub fn relationship_pair(
        &self,
        type_name: &str,
        relationship: &str,
    ) -> Result<Option<Arc<RelationshipPair>>> {
        Ok(self.resolve(type_name, relationship)?.map(|(pair, _)| pair))
    }

    fn resolve(&self, type_name: &str, relationship: &str) -> Result<Option<(Arc<RelationshipPair>, Side)>> {
        let ty = self.schema.resolve_type(type_name)?;
        if !ty.has_relationship(relationship) {
            return Ok(None);
        }

        let own = SideKey::new(type_name, relationship);
        let other = match self.schema.inverse_of(ty, relationship) {
            Some(inverse) => SideKey::new(inverse.owner_type, inverse.name),
            None => SideKey::unbound(),
        };
        let key = pair_key(&own, &other);

        let existing = self.pairs.read().get(&key).cloned();
        let pair = match existing {
            Some(pair) => pair,
            None => {
                let mut pairs = self.pairs.write();
                let dedupe = self.config.dedupe_inverse_refs;
                pairs
                    .entry(key)
                    .or_insert_with_key(|key| {
                        tracing::trace!(%key, "allocated relationship pair");
                        Arc::new(RelationshipPair::new(own.clone(), other, dedupe))
                    })
                    .clone()
            }
        };

        Ok(pair.side_of(type_name, relationship).map(|side| (pair, side)))
    }
}

impl std::fmt::Debug for RelationshipPayloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipPayloadCache")
            .field("config", &self.config)
            .field("pairs", &self.pair_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
