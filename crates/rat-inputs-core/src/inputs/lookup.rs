use crate::domain::SourceType;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("{owner} refers to {kind} \"{name}\" in field \"{field}\", but no such {kind} exists")]
    UnknownName {
        owner: String,
        field: &'static str,
        kind: &'static str,
        name: String,
    },
    #[error("{owner} must set field \"{field}\" for this calculation")]
    Missing { owner: String, field: &'static str },
    #[error("{owner} uses a {source_type} source in field \"{field}\", which is not supported")]
    Unsupported {
        owner: String,
        field: &'static str,
        source_type: SourceType,
    },
    #[error("{owner} lists {found} names in field \"{field}\", but at most {limit} are allowed")]
    TooManyValues {
        owner: String,
        field: &'static str,
        found: usize,
        limit: usize,
    },
}

/// Name to position table for one named collection, built once per
/// translation. Lookup is exact and case-sensitive; a repeated name keeps
/// its first position.
#[derive(Debug, Clone)]
pub struct NameIndex<'a> {
    kind: &'static str,
    positions: HashMap<&'a str, usize>,
    len: usize,
}

impl<'a> NameIndex<'a> {
    pub fn new<I>(kind: &'static str, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions = HashMap::new();
        let mut len = 0;
        for (position, name) in names.into_iter().enumerate() {
            positions.entry(name).or_insert(position);
            len = position + 1;
        }
        Self {
            kind,
            positions,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 0-based position in the canonical ordering.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// 1-based wire index for `name`, or a reference error naming the owner
    /// and field that asked for it.
    pub fn resolve(
        &self,
        owner: &str,
        field: &'static str,
        name: &str,
    ) -> Result<usize, ReferenceError> {
        self.position(name)
            .map(|position| position + 1)
            .ok_or_else(|| self.unknown(owner, field, name))
    }

    /// The entity of `items` (the collection this table was built from)
    /// that `name` refers to.
    pub fn lookup<'b, T>(
        &self,
        items: &'b [T],
        owner: &str,
        field: &'static str,
        name: &str,
    ) -> Result<&'b T, ReferenceError> {
        self.position(name)
            .and_then(|position| items.get(position))
            .ok_or_else(|| self.unknown(owner, field, name))
    }

    fn unknown(&self, owner: &str, field: &'static str, name: &str) -> ReferenceError {
        ReferenceError::UnknownName {
            owner: owner.to_string(),
            field,
            kind: self.kind,
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NameIndex, ReferenceError};

    #[test]
    fn resolve_is_one_based_and_first_match() {
        let index = NameIndex::new("parameter", ["Thickness", "SLD", "Thickness"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.position("SLD"), Some(1));
        assert_eq!(index.resolve("Layer 1", "thickness", "Thickness"), Ok(1));
        assert_eq!(index.resolve("Layer 1", "sld", "SLD"), Ok(2));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let index = NameIndex::new("bulk in", ["SLD Air"]);
        let error = index
            .resolve("Contrast A", "bulk_in", "sld air")
            .expect_err("case differs");
        assert_eq!(
            error,
            ReferenceError::UnknownName {
                owner: "Contrast A".to_string(),
                field: "bulk_in",
                kind: "bulk in",
                name: "sld air".to_string(),
            }
        );
        assert_eq!(
            error.to_string(),
            "Contrast A refers to bulk in \"sld air\" in field \"bulk_in\", but no such bulk in exists"
        );
    }

    #[test]
    fn empty_index_resolves_nothing() {
        let index = NameIndex::new("domain ratio", std::iter::empty());
        assert!(index.is_empty());
        assert_eq!(index.position("Domain Ratio 1"), None);
    }
}
