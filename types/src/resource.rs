//! Handle to a resource that finished loading.

use std::sync::Arc;

use crate::Identifier;

#[derive(Debug)]
struct Loaded {
    id: Identifier,
    source: String,
}

/// Terminal success value of a fetch.
///
/// Every caller that shared a load gets a clone of the same handle, so
/// [`ResourceHandle::same_resource`] can tell whether two handles came out of
/// one fetch.
#[derive(Debug, Clone)]
pub struct ResourceHandle(Arc<Loaded>);

impl ResourceHandle {
    #[must_use]
    pub fn new(id: Identifier, source: impl Into<String>) -> Self {
        Self(Arc::new(Loaded {
            id,
            source: source.into(),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &Identifier {
        &self.0.id
    }

    /// Loaded source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0.source
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.source.is_empty()
    }

    /// Whether both handles point at the same loaded instance.
    #[must_use]
    pub fn same_resource(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
