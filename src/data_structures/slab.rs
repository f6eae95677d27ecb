use std::fmt::{self, Display, Formatter};

/// Transparent type that represents an index into a [Slab].
///
/// Used to discourage accessing the [Slab] at arbitrary indexes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct SlabIndex(pub(super) usize);
impl SlabIndex {
    /// Returns the inner [usize].
    ///
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize(&self) -> usize {
        self.0
    }
    /// Returns a new [SlabIndex] created from the provided [usize].
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
        i: usize,
    ) -> Self {
        Self(i)
    }
}
impl Display for SlabIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append only slab. Stores items of the same type, removed slots are left empty
/// and their indexes are never handed out again, so an index is a stable identity
/// for the lifetime of the slab and iteration order is insertion order.
///
/// # Example
///
/// ```
/// # use wirenet::data_structures::Slab;
/// let mut s = Slab::new();
///
/// let index = s.insert(5);
/// assert_eq!(s.get(index), Some(&5));
///
/// assert_eq!(s.remove(index), Some(5));
///
/// assert_eq!(s.get(index), None);
/// assert_ne!(s.insert(6), index);
/// ```
#[derive(Debug, Clone)]
pub struct Slab<T: Sized> {
    data: Vec<Option<T>>,
    removed: usize,
}
impl<T: Sized> Slab<T> {
    /// Returns an empty [Slab].
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            removed: 0,
        }
    }

    /// Inserts an item at the end of the slab and returns its index.
    pub fn insert(&mut self, item: T) -> SlabIndex {
        let index = SlabIndex(self.data.len());
        self.data.push(Some(item));
        index
    }

    /// Returns the index the next call to [Slab::insert] will return.
    pub fn next_index(&self) -> SlabIndex {
        SlabIndex(self.data.len())
    }

    /// Returns a mutable reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get_mut(&mut self, index: SlabIndex) -> Option<&mut T> {
        self.data.get_mut(index.0)?.as_mut()
    }

    /// Return a reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get(&self, index: SlabIndex) -> Option<&T> {
        self.data.get(index.0)?.as_ref()
    }

    /// Returns true if `index` holds an item.
    pub fn contains(&self, index: SlabIndex) -> bool {
        self.get(index).is_some()
    }

    /// Removes an item from the Slab and returns it.
    ///
    /// Returns [None] if `index` has been removed.
    /// Unlike a regular slab, `index` will not be reused.
    pub fn remove(&mut self, index: SlabIndex) -> Option<T> {
        let item = self.data.get_mut(index.0)?.take()?;
        self.removed += 1;
        Some(item)
    }

    /// Returns the number of items in the slab.
    ///
    /// This is different from the number of allocated slots in the slab, see [Slab::total_len]
    pub fn len(&self) -> usize {
        self.data.len() - self.removed
    }

    /// Returns true if the number of items in the slab is 0.
    ///
    /// This is different from the number of allocated slots in the slab, see [Slab::total_len]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated slots in the slab, some of them could be empty.
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Removes every item and forgets every index.
    pub fn clear(&mut self) {
        self.data.clear();
        self.removed = 0;
    }

    /// Returns an iterator over pairs of ```(SlabIndex, [&T])``` in insertion order.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            iter: self.data.iter().enumerate(),
        }
    }
}

/// [Iterator] for [Slab]
pub struct Iter<'a, T> {
    iter: std::iter::Enumerate<std::slice::Iter<'a, Option<T>>>,
}
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlabIndex, &'a T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, item) = self.iter.next()?;
            if let Some(item) = item {
                return Some((SlabIndex(i), item));
            }
        }
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut s: Slab<_> = Default::default();

        assert_eq!(s.get(SlabIndex(0)), None);

        let index = s.insert(1);
        assert_eq!(*s.get(index).unwrap(), 1);
        assert_eq!(s.get(SlabIndex(1)), None);

        s.remove(index);
        assert_eq!(s.get(index), None);
    }

    #[test]
    fn test_get_mut() {
        let mut s: Slab<_> = Default::default();

        assert_eq!(s.get_mut(SlabIndex(0)), None);

        let index = s.insert(1);
        *s.get_mut(index).unwrap() = 4;
        assert_eq!(s.get(index), Some(&4));

        s.remove(index);
        assert_eq!(s.get_mut(index), None);
    }

    #[test]
    fn test_remove_never_reuses() {
        let mut s = Slab::new();

        assert_eq!(s.remove(SlabIndex(0)), None);

        let index = s.insert(1);
        assert_eq!(s.remove(index), Some(1));
        assert_eq!(s.remove(index), None);

        let new_index = s.insert(2);
        assert_ne!(index, new_index);
        assert_eq!(s.next_index(), SlabIndex(2));
    }

    #[test]
    fn test_len() {
        let mut s = Slab::new();

        assert_eq!(s.len(), 0);
        assert!(s.is_empty());

        let index = s.insert(1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.total_len(), 1);

        s.remove(index);
        assert_eq!(s.len(), 0);
        assert!(s.is_empty());
        assert_eq!(s.total_len(), 1);

        s.insert(2);
        s.clear();
        assert_eq!(s.total_len(), 0);
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let mut s = Slab::new();
        for i in 0..10 {
            s.insert(i);
        }
        for i in (1..10).step_by(2) {
            s.remove(SlabIndex(i));
        }
        let seen: Vec<_> = s.iter().map(|(i, n)| (i.0, *n)).collect();
        assert_eq!(seen, vec![(0, 0), (2, 2), (4, 4), (6, 6), (8, 8)]);
    }
}
