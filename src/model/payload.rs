//! Relationship payloads and the cache entries built from them.

use serde::{Deserialize, Serialize};

use super::{EntityId, EntityRef};
use crate::{Error, Result};

/// The `data` member of a relationship payload.
///
/// Absent (`null`), single-valued, or an ordered list of refs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    #[default]
    Null,
    One(EntityRef),
    Many(Vec<EntityRef>),
}

impl PayloadValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PayloadValue::Null)
    }

    pub fn is_many(&self) -> bool {
        matches!(self, PayloadValue::Many(_))
    }

    /// Every ref named by this value, in order.
    pub fn refs(&self) -> &[EntityRef] {
        match self {
            PayloadValue::Null => &[],
            PayloadValue::One(r) => std::slice::from_ref(r),
            PayloadValue::Many(refs) => refs,
        }
    }

    /// Whether any named ref carries the given id.
    pub fn mentions(&self, id: &EntityId) -> bool {
        self.refs().iter().any(|r| &r.id == id)
    }
}

impl From<EntityRef> for PayloadValue {
    fn from(r: EntityRef) -> Self {
        PayloadValue::One(r)
    }
}

impl From<Vec<EntityRef>> for PayloadValue {
    fn from(refs: Vec<EntityRef>) -> Self {
        PayloadValue::Many(refs)
    }
}

impl From<Option<EntityRef>> for PayloadValue {
    fn from(r: Option<EntityRef>) -> Self {
        r.map_or(PayloadValue::Null, PayloadValue::One)
    }
}

/// One relationship's payload as received from the transport layer.
///
/// `links` and `meta` ride along untouched; only `data` drives inverse
/// propagation. A payload without `data` (links or meta only) carries
/// `PayloadValue::Null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipPayload {
    #[serde(default)]
    pub data: PayloadValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl RelationshipPayload {
    pub fn new(data: impl Into<PayloadValue>) -> Self {
        Self {
            data: data.into(),
            links: None,
            meta: None,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_links(mut self, links: serde_json::Value) -> Self {
        self.links = Some(links);
        self
    }

    /// Validate a raw JSON payload for `relationship`.
    ///
    /// The payload must be an object with at least one of `data`, `links`
    /// or `meta`. A present `data` member is `null`, a single `{type, id}`
    /// ref, or an array of refs.
    pub fn from_json(relationship: &str, raw: &serde_json::Value) -> Result<Self> {
        let invalid = |message: String| Error::InvalidPayloadShape {
            relationship: relationship.to_string(),
            message,
        };

        let obj = raw
            .as_object()
            .ok_or_else(|| invalid(format!("expected an object, got {}", json_kind(raw))))?;
        if !["data", "links", "meta"].iter().any(|k| obj.contains_key(*k)) {
            return Err(invalid("expected at least one of `data`, `links` or `meta`".into()));
        }
        if let Some(data) = obj.get("data") {
            if !matches!(
                data,
                serde_json::Value::Null | serde_json::Value::Object(_) | serde_json::Value::Array(_)
            ) {
                return Err(invalid(format!(
                    "`data` must be null, a ref or an array of refs, got {}",
                    json_kind(data)
                )));
            }
        }

        serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A cached payload for one `(entity, relationship)`.
///
/// `is_inverse` marks entries synthesized from the other side's push rather
/// than pushed directly. A to-many entry built this way is not fully loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    pub payload: RelationshipPayload,
    pub is_inverse: bool,
}

impl PayloadEntry {
    pub fn direct(payload: RelationshipPayload) -> Self {
        Self { payload, is_inverse: false }
    }

    pub fn inverse(data: impl Into<PayloadValue>) -> Self {
        Self {
            payload: RelationshipPayload::new(data),
            is_inverse: true,
        }
    }

    pub fn data(&self) -> &PayloadValue {
        &self.payload.data
    }
}
