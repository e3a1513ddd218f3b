use std::collections::HashSet;

use thiserror::Error;

use crate::Identifier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencySetError {
    #[error("dependency '{0}' is listed more than once")]
    Duplicate(Identifier),
}

/// Ordered, duplicate-free list of resources an autoloader is responsible for.
///
/// Order is dispatch order and the order of aggregated results. There is no
/// graph resolution: if one resource must come before another, list it first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    ids: Vec<Identifier>,
}

impl DependencySet {
    pub fn new(ids: impl IntoIterator<Item = Identifier>) -> Result<Self, DependencySetError> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                return Err(DependencySetError::Duplicate(id));
            }
            ordered.push(id);
        }
        Ok(Self { ids: ordered })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.ids.iter()
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Identifier;
    type IntoIter = std::slice::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
