//! Typed-id arenas.
//!
//! Every slot and coordinate node lives in a [`Store`] and is addressed by a
//! small copyable id. The next id is always the current length of the store,
//! so identities are monotonic within one mapping pass without any global
//! counter.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{Result, XlmapError};

/// An id that indexes into a [`Store`].
pub trait StoreId: Copy + Eq + Ord + fmt::Debug {
    /// Human readable kind used in "not found" errors.
    const KIND: &'static str;

    fn from_index(index: usize) -> Self;

    fn index(self) -> usize;
}

/// An item that knows its own id.
pub trait Storable {
    type Id: StoreId;

    fn id(&self) -> Self::Id;
}

/// Append-only arena keyed by a typed id.
#[derive(Debug, Clone)]
pub struct Store<T: Storable> {
    items: Vec<T>,
    _id: PhantomData<T::Id>,
}

impl<T: Storable> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Storable> Store<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _id: PhantomData,
        }
    }

    /// The id the next inserted item will receive.
    #[must_use]
    pub fn next_id(&self) -> T::Id {
        T::Id::from_index(self.items.len())
    }

    /// Insert an item built from its freshly allocated id.
    pub fn insert_with(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<T::Id> {
        let id = self.next_id();
        let item = build(id);
        if item.id() != id {
            return Err(XlmapError::invariant(format!(
                "{} built with id {:?}, expected {:?}",
                T::Id::KIND,
                item.id(),
                id
            )));
        }
        self.items.push(item);
        Ok(id)
    }

    /// Look up an item, failing with [`XlmapError::NotFound`].
    pub fn get(&self, id: T::Id) -> Result<&T> {
        self.items.get(id.index()).ok_or(XlmapError::NotFound {
            kind: T::Id::KIND,
            id: id.index(),
        })
    }

    pub fn get_mut(&mut self, id: T::Id) -> Result<&mut T> {
        self.items.get_mut(id.index()).ok_or(XlmapError::NotFound {
            kind: T::Id::KIND,
            id: id.index(),
        })
    }

    /// Look up an item that may be absent.
    #[must_use]
    pub fn try_get(&self, id: T::Id) -> Option<&T> {
        self.items.get(id.index())
    }

    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        id.index() < self.items.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate items in insertion (id) order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Declare a `u32`-backed id newtype implementing [`StoreId`].
macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $crate::store::StoreId for $name {
            const KIND: &'static str = $kind;

            #[allow(clippy::cast_possible_truncation)]
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

pub(crate) use store_id;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    store_id!(ThingId, "thing");

    #[derive(Debug)]
    struct Thing {
        id: ThingId,
        label: &'static str,
    }

    impl Storable for Thing {
        type Id = ThingId;

        fn id(&self) -> ThingId {
            self.id
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = Store::new();
        let a = store.insert_with(|id| Thing { id, label: "a" }).unwrap();
        let b = store.insert_with(|id| Thing { id, label: "b" }).unwrap();
        assert_eq!(a, ThingId(0));
        assert_eq!(b, ThingId(1));
        assert_eq!(store.next_id(), ThingId(2));
        assert_eq!(store.get(b).unwrap().label, "b");
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let store: Store<Thing> = Store::new();
        assert!(store.try_get(ThingId(3)).is_none());
        match store.get(ThingId(3)) {
            Err(XlmapError::NotFound { kind, id }) => {
                assert_eq!(kind, "thing");
                assert_eq!(id, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_id_is_rejected() {
        let mut store = Store::new();
        let result = store.insert_with(|_| Thing {
            id: ThingId(7),
            label: "wrong",
        });
        assert!(matches!(result, Err(XlmapError::Invariant(_))));
        assert!(store.is_empty());
    }
}
