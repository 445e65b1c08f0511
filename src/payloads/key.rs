//! Side and pair keys.
//!
//! One side of a relationship is keyed by `(type, relationship)`. A pair key
//! holds both side keys in sorted order, so resolving either side reaches
//! the same pair. Keys are compared field by field, never as joined strings,
//! so names containing `:` cannot collide.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SideKey {
    pub type_name: String,
    pub relationship: String,
}

impl SideKey {
    pub fn new(type_name: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relationship: relationship.into(),
        }
    }

    /// The far side of a relationship without an inverse.
    pub fn unbound() -> Self {
        Self::new("", "")
    }

    pub fn is_unbound(&self) -> bool {
        self.type_name.is_empty() && self.relationship.is_empty()
    }

    pub fn matches(&self, type_name: &str, relationship: &str) -> bool {
        self.type_name == type_name && self.relationship == relationship
    }
}

impl fmt::Display for SideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.relationship)
    }
}

/// Order-independent key for the pair formed by two sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey(SideKey, SideKey);

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.0, self.1)
    }
}

pub fn pair_key(a: &SideKey, b: &SideKey) -> PairKey {
    if a <= b {
        PairKey(a.clone(), b.clone())
    } else {
        PairKey(b.clone(), a.clone())
    }
}
