use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::ops::Index;
use core::ops::IndexMut;

use crate::error::Error;
use crate::policy;
use crate::policy::DefaultPolicy;
use crate::policy::ResizePolicy;

/// A growable and shrinkable ordered sequence with a dense, zero-based index.
///
/// `Sequence<T, P>` keeps its own notion of capacity and resizes it according
/// to the policy `P`:
///
/// - pushing into a full sequence multiplies the capacity by
///   [`ResizePolicy::UP_SCALE`] (an empty sequence allocates exactly
///   `UP_SCALE` slots);
/// - removing an element divides the capacity by [`ResizePolicy::DOWN_SCALE`]
///   once `DOWN_TRIGGER * len < capacity`, releasing the storage entirely when
///   the result is zero.
///
/// Removing index `i` shifts every later element down by one; indices are
/// never stable across removal.
///
/// The sequence is usually instantiated over references, `Sequence<&'a T>`,
/// in which case it never copies, constructs or drops the referenced data:
/// the borrow checker ties every stored reference to caller-owned storage
/// that outlives the sequence.
///
/// # Examples
///
/// ```rust
/// use chain_hash::Sequence;
///
/// let names = ["ada".to_string(), "grace".to_string(), "barbara".to_string()];
///
/// let mut seq = Sequence::new();
/// for name in &names {
///     seq.push_back(name);
/// }
/// assert_eq!(seq.size(), 3);
/// assert_eq!(seq.capacity(), 4);
///
/// assert_eq!(seq.remove(0), Some(&names[0]));
/// assert_eq!(seq.at(0), Some(&names[1]));
/// assert_eq!(seq.at(2), None);
/// ```
pub struct Sequence<T, P = DefaultPolicy> {
    storage: Vec<T>,
    capacity: usize,
    _policy: PhantomData<fn() -> P>,
}

impl<T> Sequence<T> {
    /// Creates an empty sequence under the [`DefaultPolicy`]. No storage is
    /// allocated until the first push.
    pub const fn new() -> Self {
        Self::with_policy()
    }
}

impl<T, P> Sequence<T, P>
where
    P: ResizePolicy,
{
    /// Creates an empty sequence resized according to `P`.
    ///
    /// ```rust
    /// use chain_hash::Sequence;
    /// use chain_hash::policy::DefaultPolicy;
    ///
    /// let seq = Sequence::<u8, DefaultPolicy>::with_policy();
    /// assert_eq!(seq.capacity(), 0);
    /// ```
    pub const fn with_policy() -> Self {
        let () = P::ASSERT_VALID;
        Self {
            storage: Vec::new(),
            capacity: 0,
            _policy: PhantomData,
        }
    }

    /// Creates an empty sequence with room for exactly `capacity` elements
    /// before the first growth step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if `capacity` elements of `T` do
    /// not fit in the address space, and [`Error::AllocError`] if the
    /// allocator refuses the block.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Error;
    /// use chain_hash::Sequence;
    ///
    /// let seq: Sequence<&str> = Sequence::try_with_capacity(5).unwrap();
    /// assert_eq!(seq.capacity(), 5);
    /// assert!(seq.is_empty());
    ///
    /// let err = Sequence::<u64>::try_with_capacity(usize::MAX).unwrap_err();
    /// assert_eq!(err, Error::CapacityOverflow);
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut seq = Self::with_policy();
        seq.try_grow_to(capacity)?;
        Ok(seq)
    }

    /// Returns the number of elements in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns the number of elements in the sequence.
    ///
    /// Alias of [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Returns `true` if the sequence holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns the number of slots the policy has granted this sequence.
    ///
    /// This is the policy capacity, not the capacity of the underlying
    /// allocation, which the allocator may round up.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Sequence;
    ///
    /// let mut seq = Sequence::new();
    /// let mut capacities = vec![seq.capacity()];
    /// for i in 0..5 {
    ///     seq.push_back(i);
    ///     if capacities.last() != Some(&seq.capacity()) {
    ///         capacities.push(seq.capacity());
    ///     }
    /// }
    /// assert_eq!(capacities, [0, 2, 4, 8]);
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `value` at index `len()`, growing the storage if the sequence
    /// is full.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocation fails. Use [`try_push_back`](Self::try_push_back) to handle
    /// either case.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.try_push_back(value) {
            err.handle();
        }
    }

    /// Appends `value` at index `len()`, growing the storage if the sequence
    /// is full.
    ///
    /// # Errors
    ///
    /// If the storage cannot grow, `value` is dropped, the error is returned
    /// and the sequence is left untouched.
    pub fn try_push_back(&mut self, value: T) -> Result<(), Error> {
        if self.storage.len() + 1 > self.capacity {
            let capacity = policy::grown::<P>(self.capacity).ok_or(Error::CapacityOverflow)?;
            self.try_grow_to(capacity)?;
        }
        self.storage.push(value);
        Ok(())
    }

    /// Removes and returns the element at `idx`, shifting every later
    /// element down by one. Returns `None` if `idx >= len()`.
    ///
    /// If fewer than one slot in [`ResizePolicy::DOWN_TRIGGER`] remains
    /// occupied afterwards, the capacity is divided by
    /// [`ResizePolicy::DOWN_SCALE`]; a capacity of zero releases the storage.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if the smaller block cannot be allocated. Use
    /// [`try_remove`](Self::try_remove) to handle that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Sequence;
    ///
    /// let mut seq: Sequence<u8> = (0..8).collect();
    /// assert_eq!(seq.capacity(), 8);
    ///
    /// assert_eq!(seq.remove(10), None);
    /// for _ in 0..7 {
    ///     seq.remove(0);
    /// }
    /// assert_eq!(seq.at(0), Some(7));
    /// assert_eq!(seq.capacity(), 4);
    /// ```
    pub fn remove(&mut self, idx: usize) -> Option<T> {
        match self.try_remove(idx) {
            Ok(removed) => removed,
            Err(err) => err.handle(),
        }
    }

    /// Removes and returns the element at `idx` like [`remove`](Self::remove),
    /// reporting a failed shrink instead of aborting.
    ///
    /// # Errors
    ///
    /// If the shrink step cannot allocate its smaller block, the error is
    /// returned and the sequence is left untouched.
    pub fn try_remove(&mut self, idx: usize) -> Result<Option<T>, Error> {
        if idx >= self.storage.len() {
            return Ok(None);
        }

        let remaining = self.storage.len() - 1;
        if !policy::should_shrink::<P>(remaining, self.capacity) {
            return Ok(Some(self.storage.remove(idx)));
        }

        let capacity = policy::shrunk::<P>(self.capacity);
        debug_assert!(remaining <= capacity);
        let mut storage = Vec::new();
        if capacity > 0 {
            let layout = Layout::array::<T>(capacity).map_err(|_| Error::CapacityOverflow)?;
            storage
                .try_reserve_exact(capacity)
                .map_err(|_| Error::AllocError { layout })?;
        }

        let value = self.storage.remove(idx);
        // Fits in the reserved block, so this never reallocates.
        storage.append(&mut self.storage);
        self.storage = storage;
        self.capacity = capacity;
        Ok(Some(value))
    }

    /// Returns a copy of the element at `idx`, or `None` if `idx >= len()`.
    ///
    /// For a sequence of references this hands back the stored reference
    /// itself.
    #[inline]
    pub fn at(&self, idx: usize) -> Option<T>
    where
        T: Copy,
    {
        self.storage.get(idx).copied()
    }

    /// Returns a reference to the element at `idx`, or `None` if
    /// `idx >= len()`.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.storage.get(idx)
    }

    /// Returns a mutable reference to the element at `idx`, or `None` if
    /// `idx >= len()`.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.storage.get_mut(idx)
    }

    /// Overwrites the element at `idx` and returns the one it replaced.
    ///
    /// Does nothing and returns `None` if `idx >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Sequence;
    ///
    /// let mut seq: Sequence<char> = "ab".chars().collect();
    /// assert_eq!(seq.set(1, 'z'), Some('b'));
    /// assert_eq!(seq.set(2, 'q'), None);
    /// assert_eq!(seq.as_slice(), ['a', 'z']);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize, value: T) -> Option<T> {
        self.storage
            .get_mut(idx)
            .map(|slot| core::mem::replace(slot, value))
    }

    /// Returns the live elements as a slice, in index order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    /// Returns an iterator over the live elements in index order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.storage.iter()
    }

    /// Removes every element and releases the storage.
    pub fn clear(&mut self) {
        self.storage = Vec::new();
        self.capacity = 0;
    }

    fn try_grow_to(&mut self, capacity: usize) -> Result<(), Error> {
        debug_assert!(capacity >= self.storage.len());
        let layout = Layout::array::<T>(capacity).map_err(|_| Error::CapacityOverflow)?;
        self.storage
            .try_reserve_exact(capacity - self.storage.len())
            .map_err(|_| Error::AllocError { layout })?;
        self.capacity = capacity;
        Ok(())
    }
}

impl<T, P> Default for Sequence<T, P>
where
    P: ResizePolicy,
{
    fn default() -> Self {
        Self::with_policy()
    }
}

impl<T, P> Debug for Sequence<T, P>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.storage.iter()).finish()
    }
}

/// Cloning copies the live elements only. The clone is granted the same
/// policy capacity as the source, so both grow and shrink in lockstep.
impl<T, P> Clone for Sequence<T, P>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        let mut storage = Vec::with_capacity(self.capacity);
        storage.extend_from_slice(&self.storage);
        Self {
            storage,
            capacity: self.capacity,
            _policy: PhantomData,
        }
    }
}

impl<T, P> PartialEq for Sequence<T, P>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl<T, P> Eq for Sequence<T, P> where T: Eq {}

impl<T, P> FromIterator<T> for Sequence<T, P>
where
    P: ResizePolicy,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Self::with_policy();
        seq.extend(iter);
        seq
    }
}

impl<T, P> Extend<T> for Sequence<T, P>
where
    P: ResizePolicy,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T, P> Index<usize> for Sequence<T, P> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `idx >= len()`. Use [`Sequence::get`] for a checked read.
    #[inline]
    fn index(&self, idx: usize) -> &T {
        &self.storage[idx]
    }
}

impl<T, P> IndexMut<usize> for Sequence<T, P> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.storage[idx]
    }
}

impl<'a, T, P> IntoIterator for &'a Sequence<T, P> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.storage.iter()
    }
}

impl<T, P> IntoIterator for Sequence<T, P> {
    type Item = T;
    type IntoIter = alloc::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.storage.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn push_preserves_order() {
        let items: Vec<String> = (0..37).map(|i| i.to_string()).collect();
        let mut seq: Sequence<&String> = Sequence::new();
        for (i, item) in items.iter().enumerate() {
            seq.push_back(item);
            assert_eq!(seq.size(), i + 1);
        }
        for (i, item) in items.iter().enumerate() {
            assert!(core::ptr::eq(seq.at(i).unwrap(), item));
        }
        assert_eq!(seq.at(items.len()), None);
    }

    #[test]
    fn growth_happens_only_when_full() {
        let mut seq: Sequence<u32> = Sequence::new();
        assert_eq!(seq.capacity(), 0);

        let mut expected = 0;
        for i in 0..64u32 {
            let before = seq.capacity();
            seq.push_back(i);
            if i as usize + 1 > before {
                expected = if before == 0 { 2 } else { before * 2 };
            }
            assert_eq!(seq.capacity(), expected, "after push {}", i);
        }
        assert_eq!(seq.capacity(), 64);
    }

    #[test]
    fn remove_shifts_left() {
        let mut seq: Sequence<u32> = (0..10).collect();
        assert_eq!(seq.remove(3), Some(3));
        assert_eq!(seq.at(3), Some(4));
        assert_eq!(seq.as_slice(), [0, 1, 2, 4, 5, 6, 7, 8, 9]);

        assert_eq!(seq.remove(8), Some(9));
        assert_eq!(seq.remove(8), None);
        assert_eq!(seq.len(), 8);
    }

    #[test]
    fn shrink_trigger_is_exact() {
        let mut seq: Sequence<u32> = (0..8).collect();
        assert_eq!(seq.capacity(), 8);

        // 4 * remaining < 8 first holds at one remaining element.
        for remaining in (2..8).rev() {
            seq.remove(0);
            assert_eq!(seq.len(), remaining);
            assert_eq!(seq.capacity(), 8);
        }
        seq.remove(0);
        assert_eq!(seq.capacity(), 4);
        assert_eq!(seq.as_slice(), [7]);

        seq.remove(0);
        assert!(seq.is_empty());
        assert_eq!(seq.capacity(), 2);
    }

    #[test]
    fn try_remove_shrinks_into_fresh_block() {
        let mut seq: Sequence<u32> = (0..8).collect();
        for _ in 0..6 {
            assert!(seq.try_remove(0).unwrap().is_some());
        }
        assert_eq!(seq.capacity(), 8);

        assert_eq!(seq.try_remove(1), Ok(Some(7)));
        assert_eq!(seq.capacity(), 4);
        assert!(seq.storage.capacity() >= 4);
        assert_eq!(seq.as_slice(), [6]);
        assert_eq!(seq.try_remove(1), Ok(None));
    }

    #[test]
    fn shrink_to_zero_releases_storage() {
        let mut seq: Sequence<u8> = Sequence::new();
        seq.push_back(1);
        assert_eq!(seq.remove(0), Some(1));
        assert_eq!(seq.capacity(), 1);

        seq.push_back(2);
        assert_eq!(seq.capacity(), 1);
        assert_eq!(seq.remove(0), Some(2));
        assert_eq!(seq.capacity(), 0);
        assert_eq!(seq.storage.capacity(), 0);

        seq.push_back(3);
        assert_eq!(seq.capacity(), 2);
    }

    #[test]
    fn out_of_range_is_absent() {
        let mut seq: Sequence<u8> = Sequence::new();
        assert_eq!(seq.at(0), None);
        assert_eq!(seq.get(0), None);
        assert_eq!(seq.set(0, 1), None);
        assert_eq!(seq.remove(0), None);
        assert!(seq.is_empty());

        seq.push_back(5);
        assert_eq!(seq.set(1, 9), None);
        assert_eq!(seq.as_slice(), [5]);
    }

    #[test]
    fn set_and_get_mut() {
        let mut seq: Sequence<u8> = vec![1, 2, 3].into_iter().collect();
        assert_eq!(seq.set(0, 10), Some(1));
        *seq.get_mut(2).unwrap() += 30;
        assert_eq!(seq.as_slice(), [10, 2, 33]);
    }

    #[test]
    fn never_drops_referenced_data() {
        let owned = vec![String::from("x"), String::from("y")];
        {
            let mut seq = Sequence::<&String>::new();
            seq.push_back(&owned[0]);
            seq.push_back(&owned[1]);
            seq.remove(0);
            seq.clear();
        }
        assert_eq!(owned, ["x", "y"]);
    }

    #[test]
    fn clone_copies_live_elements() {
        let mut seq: Sequence<u32> = (0..5).collect();
        seq.remove(4);
        let cloned = seq.clone();
        assert_eq!(cloned, seq);
        assert_eq!(cloned.capacity(), seq.capacity());
        assert_eq!(cloned.len(), 4);

        let mut target: Sequence<u32> = (100..200).collect();
        target.clone_from(&seq);
        assert_eq!(target.as_slice(), [0, 1, 2, 3]);
        assert_eq!(target.capacity(), 8);
    }

    #[test]
    fn with_capacity_defers_growth() {
        let mut seq: Sequence<u8> = Sequence::try_with_capacity(3).unwrap();
        seq.extend([1, 2, 3]);
        assert_eq!(seq.capacity(), 3);
        seq.push_back(4);
        assert_eq!(seq.capacity(), 6);
    }

    #[test]
    fn capacity_overflow_is_reported() {
        let err = Sequence::<u64>::try_with_capacity(usize::MAX).unwrap_err();
        assert_eq!(err, Error::CapacityOverflow);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn allocation_failure_leaves_sequence_untouched() {
        let mut seq: Sequence<u64> = (0..3).collect();
        let err = seq.try_grow_to(isize::MAX as usize / 8).unwrap_err();
        assert!(matches!(err, Error::AllocError { .. }), "{:?}", err);
        assert_eq!(seq.as_slice(), [0, 1, 2]);
        assert_eq!(seq.capacity(), 4);
    }

    #[test]
    #[should_panic]
    fn index_out_of_range_panics() {
        let seq: Sequence<u8> = (0..2).collect();
        let _ = seq[2];
    }

    #[test]
    fn debug_lists_elements() {
        let seq: Sequence<u8> = (1..4).collect();
        assert_eq!(alloc::format!("{:?}", seq), "[1, 2, 3]");
    }
}
