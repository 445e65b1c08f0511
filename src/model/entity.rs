//! Entity ids and the typed refs relationship payloads point at.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque entity identifier.
///
/// Transport layers hand out ids as either JSON strings or numbers; both
/// normalize to the same string form so `1` and `"1"` name the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Str(String),
            Int(i64),
            UInt(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Str(s) => EntityId(s),
            RawId::Int(i) => EntityId(i.to_string()),
            RawId::UInt(u) => EntityId(u.to_string()),
        })
    }
}

/// A typed pointer to one entity in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}
