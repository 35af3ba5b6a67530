//! The kind tree and the ancestor/subtype relation over it.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::event::{Event, EventContent};
use crate::kind::{EventKind, KindDescriptor, kinds};

/// Tree of event kinds rooted at [`kinds::ANY_EVENT`].
///
/// Every kind has exactly one parent, registered before it, and no kind is
/// ever removed or re-parented. Ancestor walks are therefore bounded by the
/// depth of the tree.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    descriptors: HashMap<EventKind, KindDescriptor>,
    /// Registration order, for stable listing.
    order: Vec<EventKind>,
}

impl Taxonomy {
    /// Create a taxonomy seeded with the built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        let catalog = kinds::catalog();
        let mut taxonomy = Self {
            descriptors: HashMap::with_capacity(catalog.len()),
            order: Vec::with_capacity(catalog.len()),
        };
        for descriptor in catalog {
            taxonomy.insert(descriptor);
        }
        taxonomy
    }

    fn insert(&mut self, descriptor: KindDescriptor) {
        self.order.push(descriptor.kind().clone());
        self.descriptors.insert(descriptor.kind().clone(), descriptor);
    }

    /// Register a new kind under an existing parent.
    ///
    /// The new kind inherits its parent's context.
    ///
    /// # Errors
    ///
    /// - [`TaxonomyError::DuplicateKind`] if the name is taken.
    /// - [`TaxonomyError::UnknownParent`] if the parent is not registered.
    /// - [`TaxonomyError::ReservedRoot`] if the parent is the universal root.
    pub fn register_kind<P>(
        &mut self,
        kind: impl Into<EventKind>,
        parent: &P,
    ) -> TaxonomyResult<KindDescriptor>
    where
        P: AsRef<EventKind> + ?Sized,
    {
        let kind = kind.into();
        let parent = parent.as_ref();

        if self.descriptors.contains_key(&kind) {
            return Err(TaxonomyError::DuplicateKind(kind));
        }
        let Some(parent_desc) = self.descriptors.get(parent) else {
            return Err(TaxonomyError::UnknownParent {
                kind,
                parent: parent.clone(),
            });
        };
        if parent_desc.parent().is_none() {
            return Err(TaxonomyError::ReservedRoot(kind));
        }

        let descriptor = KindDescriptor::extension(kind, parent.clone(), parent_desc.context());
        debug!(
            kind = %descriptor.kind(),
            parent = %parent,
            context = ?descriptor.context(),
            "Event kind registered"
        );
        self.insert(descriptor.clone());
        Ok(descriptor)
    }

    /// Path from `kind` to the universal root, nearest ancestor first.
    ///
    /// `kind` itself is not included.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::UnknownKind`] if `kind` is not registered.
    pub fn ancestors_of<K>(&self, kind: &K) -> TaxonomyResult<Vec<EventKind>>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        let kind = kind.as_ref();
        let mut current = self
            .descriptors
            .get(kind)
            .ok_or_else(|| TaxonomyError::UnknownKind(kind.clone()))?;

        let mut ancestors = Vec::new();
        while let Some(parent) = current.parent() {
            ancestors.push(parent.clone());
            match self.descriptors.get(parent) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(ancestors)
    }

    /// Whether `a` is `b` or a descendant of `b`.
    ///
    /// Every kind is a subtype of itself, registered or not. An
    /// unregistered `a` is a subtype of nothing else.
    #[must_use]
    pub fn is_subtype<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: AsRef<EventKind> + ?Sized,
        B: AsRef<EventKind> + ?Sized,
    {
        let (a, b) = (a.as_ref(), b.as_ref());
        if a == b {
            return true;
        }
        let mut current = self.descriptors.get(a);
        while let Some(desc) = current {
            if desc.kind() == b {
                return true;
            }
            current = desc.parent().and_then(|p| self.descriptors.get(p));
        }
        false
    }

    /// Descriptor of a registered kind.
    #[must_use]
    pub fn descriptor<K>(&self, kind: &K) -> Option<&KindDescriptor>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.descriptors.get(kind.as_ref())
    }

    /// Whether the kind is registered.
    #[must_use]
    pub fn contains<K>(&self, kind: &K) -> bool
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.descriptors.contains_key(kind.as_ref())
    }

    /// Direct children of a kind, in registration order.
    #[must_use]
    pub fn children_of<K>(&self, kind: &K) -> Vec<&KindDescriptor>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        let kind = kind.as_ref();
        self.kinds()
            .filter(|desc| desc.parent() == Some(kind))
            .collect()
    }

    /// All registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &KindDescriptor> {
        self.order
            .iter()
            .filter_map(|kind| self.descriptors.get(kind))
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Construct an event of any registered kind by name.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::UnknownKind`] if `kind` is not registered.
    pub fn event<K>(&self, kind: &K, content: EventContent) -> TaxonomyResult<Event>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        let kind = kind.as_ref();
        self.descriptors
            .get(kind)
            .map(|desc| Event::new(desc, content))
            .ok_or_else(|| TaxonomyError::UnknownKind(kind.clone()))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new()
    }
}
