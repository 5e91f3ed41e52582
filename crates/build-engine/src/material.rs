//! Material identifiers and resolution
//!
//! A `MaterialId` is always namespaced; anything the generation service
//! invents outside the namespace becomes the fallback block.

use std::collections::HashSet;
use std::fmt;

use generation::constants::materials::{FALLBACK, NAMESPACE_PREFIX};
use serde::Serialize;

/// A recognised, namespaced material identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MaterialId(String);

impl MaterialId {
    /// Accept `raw` only if it is a recognised identifier
    pub fn parse(raw: &str) -> Option<Self> {
        is_recognised(raw).then(|| Self(raw.to_string()))
    }

    /// Accept `raw` or substitute the fallback. Idempotent.
    pub fn sanitize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(Self::fallback)
    }

    /// The block used in place of unrecognised identifiers
    pub fn fallback() -> Self {
        Self(FALLBACK.to_string())
    }

    /// `minecraft:air`
    pub fn air() -> Self {
        Self(format!("{}air", NAMESPACE_PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier without the namespace prefix
    pub fn path(&self) -> &str {
        &self.0[NAMESPACE_PREFIX.len()..]
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `minecraft:` followed by a non-empty resource path
fn is_recognised(raw: &str) -> bool {
    match raw.strip_prefix(NAMESPACE_PREFIX) {
        Some(path) => {
            !path.is_empty()
                && path
                    .chars()
                    .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/'))
        }
        None => false,
    }
}

/// Resolves identifiers to materials the target actually knows.
///
/// `Permissive` trusts every recognised identifier; `Known` limits
/// resolution to a fixed set and maps the rest to the fallback.
#[derive(Debug, Clone, Default)]
pub enum MaterialCatalog {
    #[default]
    Permissive,
    Known(HashSet<MaterialId>),
}

impl MaterialCatalog {
    pub fn permissive() -> Self {
        Self::Permissive
    }

    /// Catalog restricted to `ids`; the fallback is always included
    pub fn known<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: HashSet<MaterialId> = ids
            .into_iter()
            .filter_map(|id| MaterialId::parse(id.as_ref()))
            .collect();
        set.insert(MaterialId::fallback());
        set.insert(MaterialId::air());
        Self::Known(set)
    }

    /// Concrete material for `id`, falling back to the default solid block
    pub fn resolve(&self, id: &MaterialId) -> MaterialId {
        match self {
            Self::Permissive => id.clone(),
            Self::Known(set) if set.contains(id) => id.clone(),
            Self::Known(_) => {
                log::debug!("Unknown material {}, using {}", id, FALLBACK);
                MaterialId::fallback()
            }
        }
    }
}
