use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

/// A dense, append-only arena addressed by typed ids.
///
/// Entries are never removed, so an id handed out once stays valid for
/// the lifetime of the arena.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Arena<Id: IdLike + Copy, T> {
    inner: Vec<T>,
    #[serde(skip)]
    _phantom: PhantomData<Id>,
}

impl<Id: IdLike + Copy, T> Arena<Id, T> {
    pub fn new() -> Self {
        Self {
            inner: Vec::new(),
            _phantom: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
            _phantom: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn push(&mut self, x: T) -> Id {
        let id = Id::from_raw(self.inner.len());
        self.inner.push(x);
        id
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        self.inner.get(id.into_raw())
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut T> {
        self.inner.get_mut(id.into_raw())
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> {
        (0..self.inner.len()).map(Id::from_raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &T)> {
        self.inner
            .iter()
            .enumerate()
            .map(|(i, v)| (Id::from_raw(i), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id, &mut T)> {
        self.inner
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (Id::from_raw(i), v))
    }
}

impl<Id: IdLike + Copy, T> Default for Arena<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: IdLike + Copy, T> Index<Id> for Arena<Id, T> {
    type Output = T;

    fn index(&self, index: Id) -> &Self::Output {
        &self.inner[index.into_raw()]
    }
}

impl<Id: IdLike + Copy, T> IndexMut<Id> for Arena<Id, T> {
    fn index_mut(&mut self, index: Id) -> &mut Self::Output {
        &mut self.inner[index.into_raw()]
    }
}

pub trait IdLike {
    fn from_raw(index: usize) -> Self;
    fn into_raw(self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct TestId(u32);

    impl IdLike for TestId {
        fn from_raw(index: usize) -> Self {
            Self(index as u32)
        }

        fn into_raw(self) -> usize {
            self.0 as usize
        }
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let mut arena: Arena<TestId, &str> = Arena::new();
        let a = arena.push("a");
        let b = arena.push("b");
        assert_eq!(a, TestId(0));
        assert_eq!(b, TestId(1));
        arena[a] = "c";
        assert_eq!(arena[a], "c");
        assert_eq!(arena.get(TestId(2)), None);
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![a, b]);
    }
}
