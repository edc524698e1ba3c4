use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::Error;
use crate::policy;
use crate::policy::DefaultPolicy;
use crate::policy::ResizePolicy;
use crate::sequence::Sequence;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hash builder used by [`ChainMap::new`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hash builder used by [`ChainMap::new`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}

/// Maps keys to buckets and decides key equality for a [`ChainMap`].
///
/// The strategy is fixed when the map is constructed. Every
/// [`BuildHasher`] is a strategy for `K: Hash + Eq`; [`FnIndex`] adapts a
/// pair of plain functions.
pub trait BucketIndex<K: ?Sized> {
    /// Returns the bucket `key` belongs to among `bucket_count` buckets.
    ///
    /// Must be in `0..bucket_count` and must only depend on `key` and
    /// `bucket_count`. An index outside that range trips a debug assertion
    /// in [`ChainMap`]; release builds reduce it modulo `bucket_count`.
    fn bucket_index(&self, key: &K, bucket_count: usize) -> usize;

    /// Returns `true` if `a` and `b` are the same key.
    fn key_eq(&self, a: &K, b: &K) -> bool;
}

impl<K, S> BucketIndex<K> for S
where
    K: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn bucket_index(&self, key: &K, bucket_count: usize) -> usize {
        (self.hash_one(key) % bucket_count as u64) as usize
    }

    #[inline]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// A [`BucketIndex`] built from a key comparator and a bucket hash function.
///
/// `hash(key, bucket_count)` receives the current bucket count and must
/// return an index below it.
#[derive(Clone, Copy)]
pub struct FnIndex<E, H> {
    key_eq: E,
    hash: H,
}

impl<E, H> FnIndex<E, H> {
    /// Pairs a key comparator with a bucket hash function.
    pub fn new(key_eq: E, hash: H) -> Self {
        Self { key_eq, hash }
    }
}

impl<K, E, H> BucketIndex<K> for FnIndex<E, H>
where
    K: ?Sized,
    E: Fn(&K, &K) -> bool,
    H: Fn(&K, usize) -> usize,
{
    #[inline]
    fn bucket_index(&self, key: &K, bucket_count: usize) -> usize {
        (self.hash)(key, bucket_count)
    }

    #[inline]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        (self.key_eq)(a, b)
    }
}

impl<E, H> Debug for FnIndex<E, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnIndex").finish_non_exhaustive()
    }
}

type Binding<'a, K, V> = (&'a K, &'a V);
type Chain<'a, K, V, P> = Sequence<Binding<'a, K, V>, P>;

/// Debug statistics for chain map analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of bindings currently in the map
    pub populated: usize,
    /// Number of buckets
    pub bucket_count: usize,
    /// Number of buckets with an empty chain
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Bindings per bucket
    pub load_factor: f64,
    /// `chain_histogram[n]` is the number of buckets holding `n` bindings
    pub chain_histogram: alloc::vec::Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Chain Map Debug Statistics ===");
        println!(
            "Population: {} in {} buckets ({:.2} load factor)",
            self.populated, self.bucket_count, self.load_factor
        );
        println!(
            "Empty buckets: {} ({:.2}%)",
            self.empty_buckets,
            if self.bucket_count == 0 {
                0.0
            } else {
                (self.empty_buckets as f64 / self.bucket_count as f64) * 100.0
            }
        );
        println!("Longest chain: {}", self.longest_chain);
        for (len, count) in self.chain_histogram.iter().enumerate() {
            if *count > 0 {
                println!("  chain length {:>3}: {}", len, count);
            }
        }
    }
}

/// A separately chained hash map of borrowed keys and values.
///
/// `ChainMap<'a, K, V, S, P>` binds `&'a K` to `&'a V`. It never copies,
/// constructs or drops a key or a value: the caller owns them, and the
/// borrow checker makes sure they outlive the map.
///
/// The bucket array and every bucket's collision chain are
/// [`Sequence`]s resized by the same policy `P`:
///
/// - adding a new key when `len() + 1 > bucket_count() * UP_SCALE` first
///   rehashes every binding into `bucket_count() * UP_SCALE` buckets;
/// - removing a key when `(len() - 1) * DOWN_TRIGGER < bucket_count()` (and
///   more than one bucket exists) rehashes the remaining bindings into
///   `bucket_count() / DOWN_SCALE` buckets.
///
/// Keys are unique across the whole map, and every key always sits in the
/// bucket its strategy assigns it for the current bucket count.
///
/// # Examples
///
/// ```rust
/// use chain_hash::ChainMap;
///
/// let names = ["alpha", "beta", "gamma"];
/// let ranks = [1, 2, 3];
///
/// let mut map = ChainMap::with_fns(
///     |a: &str, b: &str| a == b,
///     |key: &str, buckets| key.len() % buckets,
/// );
/// for (name, rank) in names.iter().zip(&ranks) {
///     assert!(map.add(*name, rank));
/// }
///
/// assert_eq!(map.lookup("beta"), Some(&2));
/// assert!(!map.add("beta", &ranks[2]));
/// assert_eq!(map.lookup("beta"), Some(&3));
///
/// assert_eq!(map.remove("alpha"), Some("alpha"));
/// assert_eq!(map.lookup("alpha"), None);
/// assert_eq!(map.len(), 2);
/// ```
pub struct ChainMap<'a, K: ?Sized, V: ?Sized, S, P = DefaultPolicy> {
    buckets: Sequence<Chain<'a, K, V, P>, P>,
    populated: usize,
    strategy: S,
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<'a, K, V> ChainMap<'a, K, V, DefaultHashBuilder>
where
    K: Hash + Eq + ?Sized,
    V: ?Sized,
{
    /// Creates an empty map hashing keys with a randomly seeded
    /// [`DefaultHashBuilder`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::ChainMap;
    ///
    /// let key = 7u64;
    /// let mut map = ChainMap::new();
    /// map.add(&key, "seven");
    /// assert_eq!(map.lookup(&7), Some("seven"));
    /// assert_eq!(map.bucket_count(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_policy_and_hasher(DefaultHashBuilder::default())
    }
}

impl<'a, K, V, S> ChainMap<'a, K, V, S>
where
    K: ?Sized,
    V: ?Sized,
    S: BucketIndex<K>,
{
    /// Creates an empty map using `strategy` to place and compare keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use siphasher::sip::SipHasher;
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// use chain_hash::ChainMap;
    ///
    /// let mut map = ChainMap::with_hasher(BuildHasherDefault::<SipHasher>::default());
    /// map.add("key", &1);
    /// assert!(map.contains_key("key"));
    /// ```
    pub fn with_hasher(strategy: S) -> Self {
        Self::with_policy_and_hasher(strategy)
    }
}

impl<'a, K, V, E, H> ChainMap<'a, K, V, FnIndex<E, H>>
where
    K: ?Sized,
    V: ?Sized,
    E: Fn(&K, &K) -> bool,
    H: Fn(&K, usize) -> usize,
{
    /// Creates an empty map from a key comparator and a bucket hash
    /// function. `hash(key, bucket_count)` must return an index below
    /// `bucket_count`.
    pub fn with_fns(key_eq: E, hash: H) -> Self {
        Self::with_policy_and_hasher(FnIndex::new(key_eq, hash))
    }
}

impl<'a, K, V, S, P> ChainMap<'a, K, V, S, P>
where
    K: ?Sized,
    V: ?Sized,
    S: BucketIndex<K>,
    P: ResizePolicy,
{
    /// Creates an empty map resized according to `P`, starting with
    /// [`ResizePolicy::INITIAL_BUCKETS`] buckets.
    pub fn with_policy_and_hasher(strategy: S) -> Self {
        Self {
            buckets: Self::empty_buckets(P::INITIAL_BUCKETS),
            populated: 0,
            strategy,
        }
    }

    /// Returns the number of bindings in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the map holds no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the current number of buckets. Always at least one.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the strategy the map was built with.
    pub fn hasher(&self) -> &S {
        &self.strategy
    }

    /// Binds `key` to `value`.
    ///
    /// Returns `true` if a new binding was created and `false` if `key` was
    /// already bound, in which case only the value is replaced and the
    /// originally stored key reference is kept.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if a rehash
    /// cannot allocate. Use [`try_add`](Self::try_add) to handle either case.
    pub fn add(&mut self, key: &'a K, value: &'a V) -> bool {
        match self.try_add(key, value) {
            Ok(added) => added,
            Err(err) => err.handle(),
        }
    }

    /// Binds `key` to `value`, reporting allocation failures.
    ///
    /// # Errors
    ///
    /// If the grow rehash or the target chain cannot allocate, the error is
    /// returned and the map is left exactly as it was.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::ChainMap;
    ///
    /// let value = 5;
    /// let mut map = ChainMap::new();
    /// assert_eq!(map.try_add("five", &value), Ok(true));
    /// assert_eq!(map.try_add("five", &value), Ok(false));
    /// ```
    pub fn try_add(&mut self, key: &'a K, value: &'a V) -> Result<bool, Error> {
        if let Some((bucket, slot)) = self.locate(key) {
            self.buckets[bucket][slot].1 = value;
            return Ok(false);
        }

        let bucket_count = self.buckets.len();
        if self.populated + 1 > bucket_count.saturating_mul(P::UP_SCALE) {
            let grown = bucket_count
                .checked_mul(P::UP_SCALE)
                .ok_or(Error::CapacityOverflow)?;
            let mut buckets = self.try_rehash(grown, None)?;
            let bucket = self.bucket_of(key, grown);
            buckets[bucket].try_push_back((key, value))?;
            self.buckets = buckets;
        } else {
            let bucket = self.bucket_of(key, bucket_count);
            self.buckets[bucket].try_push_back((key, value))?;
        }
        self.populated += 1;
        Ok(true)
    }

    /// Returns the value bound to `key`, or `None` if `key` is not bound.
    #[inline]
    pub fn lookup(&self, key: &K) -> Option<&'a V> {
        let (bucket, slot) = self.locate(key)?;
        Some(self.buckets[bucket][slot].1)
    }

    /// Returns the value bound to `key`.
    ///
    /// Alias of [`lookup`](Self::lookup).
    #[inline]
    pub fn get(&self, key: &K) -> Option<&'a V> {
        self.lookup(key)
    }

    /// Returns the stored key and value bound to `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&'a K, &'a V)> {
        let (bucket, slot) = self.locate(key)?;
        Some(self.buckets[bucket][slot])
    }

    /// Returns `true` if `key` is bound.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.locate(key).is_some()
    }

    /// Removes the binding for `key` and returns the stored key reference,
    /// or `None` (with no effect) if `key` is not bound.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
    /// if a shrink rehash or chain shrink cannot allocate. Use
    /// [`try_remove`](Self::try_remove) to handle that case.
    pub fn remove(&mut self, key: &K) -> Option<&'a K> {
        self.remove_entry(key).map(|(key, _)| key)
    }

    /// Removes the binding for `key` and returns the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(&'a K, &'a V)> {
        match self.try_remove_entry(key) {
            Ok(removed) => removed,
            Err(err) => err.handle(),
        }
    }

    /// Removes the binding for `key`, reporting allocation failures.
    ///
    /// # Errors
    ///
    /// If the shrink rehash or the shrinking chain cannot allocate, the error
    /// is returned and the binding is still present.
    pub fn try_remove(&mut self, key: &K) -> Result<Option<&'a K>, Error> {
        Ok(self.try_remove_entry(key)?.map(|(key, _)| key))
    }

    /// Removes the binding for `key` and returns the stored key and value,
    /// reporting allocation failures.
    ///
    /// # Errors
    ///
    /// See [`try_remove`](Self::try_remove).
    pub fn try_remove_entry(&mut self, key: &K) -> Result<Option<(&'a K, &'a V)>, Error> {
        let Some((bucket, slot)) = self.locate(key) else {
            return Ok(None);
        };
        let removed = self.buckets[bucket][slot];

        let bucket_count = self.buckets.len();
        if bucket_count > 1 && policy::should_shrink::<P>(self.populated - 1, bucket_count) {
            let shrunk = policy::shrunk::<P>(bucket_count).max(1);
            self.buckets = self.try_rehash(shrunk, Some((bucket, slot)))?;
        } else {
            self.buckets[bucket].try_remove(slot)?;
        }

        self.populated -= 1;
        Ok(Some(removed))
    }

    /// Collects every key into a new [`Sequence`], in bucket order and then
    /// chain order.
    ///
    /// The order depends on the current bucket count and changes across
    /// rehashes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::ChainMap;
    ///
    /// let keys = [3u32, 1, 2];
    /// let mut map = ChainMap::new();
    /// for key in &keys {
    ///     map.add(key, &());
    /// }
    ///
    /// let mut collected: Vec<u32> = map.get_keys().into_iter().copied().collect();
    /// collected.sort();
    /// assert_eq!(collected, [1, 2, 3]);
    /// ```
    pub fn get_keys(&self) -> Sequence<&'a K> {
        self.keys().collect()
    }

    /// Removes every binding and returns to
    /// [`ResizePolicy::INITIAL_BUCKETS`] buckets.
    pub fn clear(&mut self) {
        self.buckets = Self::empty_buckets(P::INITIAL_BUCKETS);
        self.populated = 0;
    }

    /// Returns an iterator over all bindings in bucket order and then chain
    /// order.
    pub fn iter(&self) -> Iter<'_, 'a, K, V, P> {
        Iter {
            buckets: self.buckets.iter(),
            chain: [].iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over all keys, in the order of [`iter`](Self::iter).
    pub fn keys(&self) -> Keys<'_, 'a, K, V, P> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over all values, in the order of
    /// [`iter`](Self::iter).
    pub fn values(&self) -> Values<'_, 'a, K, V, P> {
        Values { inner: self.iter() }
    }

    /// Snapshot of the bucket layout.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut chain_histogram = alloc::vec::Vec::new();
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for chain in self.buckets.iter() {
            let len = chain.len();
            if chain_histogram.len() <= len {
                chain_histogram.resize(len + 1, 0);
            }
            chain_histogram[len] += 1;
            if len == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(len);
        }

        DebugStats {
            populated: self.populated,
            bucket_count: self.buckets.len(),
            empty_buckets,
            longest_chain,
            load_factor: self.populated as f64 / self.buckets.len() as f64,
            chain_histogram,
        }
    }

    /// Checks that every binding sits in its home bucket, that keys are
    /// unique and that the population count is accurate.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let bucket_count = self.buckets.len();
        assert!(bucket_count >= 1);

        let mut counted = 0;
        for (index, chain) in self.buckets.iter().enumerate() {
            for (slot, &(key, _)) in chain.iter().enumerate() {
                assert_eq!(self.bucket_of(key, bucket_count), index);
                for &(other, _) in chain.iter().skip(slot + 1) {
                    assert!(!self.strategy.key_eq(key, other));
                }
                counted += 1;
            }
        }
        assert_eq!(counted, self.populated);
    }

    #[inline]
    fn bucket_of(&self, key: &K, bucket_count: usize) -> usize {
        let index = self.strategy.bucket_index(key, bucket_count);
        debug_assert!(
            index < bucket_count,
            "bucket index {} out of range for {} buckets",
            index,
            bucket_count
        );
        index % bucket_count
    }

    /// Finds the bucket and chain slot holding `key`.
    #[inline]
    fn locate(&self, key: &K) -> Option<(usize, usize)> {
        let bucket = self.bucket_of(key, self.buckets.len());
        let slot = self.buckets[bucket]
            .iter()
            .position(|(stored, _)| self.strategy.key_eq(stored, key))?;
        Some((bucket, slot))
    }

    /// Builds a bucket array of `bucket_count` buckets holding every binding
    /// except the one at `skip`. `self` is not modified, so a failure leaves
    /// the map untouched.
    fn try_rehash(
        &self,
        bucket_count: usize,
        skip: Option<(usize, usize)>,
    ) -> Result<Sequence<Chain<'a, K, V, P>, P>, Error> {
        let mut buckets = Self::try_empty_buckets(bucket_count)?;
        for (index, chain) in self.buckets.iter().enumerate() {
            for (slot, &(key, value)) in chain.iter().enumerate() {
                if skip == Some((index, slot)) {
                    continue;
                }
                // Keys are already unique, so no duplicate scan is needed.
                let bucket = self.bucket_of(key, bucket_count);
                buckets[bucket].try_push_back((key, value))?;
            }
        }
        Ok(buckets)
    }

    fn try_empty_buckets(bucket_count: usize) -> Result<Sequence<Chain<'a, K, V, P>, P>, Error> {
        let mut buckets = Sequence::try_with_capacity(bucket_count)?;
        for _ in 0..bucket_count {
            buckets.try_push_back(Sequence::with_policy())?;
        }
        Ok(buckets)
    }

    fn empty_buckets(bucket_count: usize) -> Sequence<Chain<'a, K, V, P>, P> {
        match Self::try_empty_buckets(bucket_count) {
            Ok(buckets) => buckets,
            Err(err) => err.handle(),
        }
    }
}

impl<K, V, S, P> Debug for ChainMap<'_, K, V, S, P>
where
    K: Debug + ?Sized,
    V: Debug + ?Sized,
    S: BucketIndex<K>,
    P: ResizePolicy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(&k, &v);
        }
        map.finish()
    }
}

impl<K, V, S, P> Clone for ChainMap<'_, K, V, S, P>
where
    K: ?Sized,
    V: ?Sized,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            populated: self.populated,
            strategy: self.strategy.clone(),
        }
    }
}

impl<K, V, S, P> Default for ChainMap<'_, K, V, S, P>
where
    K: ?Sized,
    V: ?Sized,
    S: BucketIndex<K> + Default,
    P: ResizePolicy,
{
    fn default() -> Self {
        Self::with_policy_and_hasher(S::default())
    }
}

impl<'a, K, V, S, P> Extend<(&'a K, &'a V)> for ChainMap<'a, K, V, S, P>
where
    K: ?Sized,
    V: ?Sized,
    S: BucketIndex<K>,
    P: ResizePolicy,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

impl<'m, 'a, K, V, S, P> IntoIterator for &'m ChainMap<'a, K, V, S, P>
where
    K: ?Sized,
    V: ?Sized,
    S: BucketIndex<K>,
    P: ResizePolicy,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'m, 'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the bindings of a [`ChainMap`].
///
/// Created by [`ChainMap::iter`].
pub struct Iter<'m, 'a, K: ?Sized, V: ?Sized, P> {
    buckets: core::slice::Iter<'m, Chain<'a, K, V, P>>,
    chain: core::slice::Iter<'m, Binding<'a, K, V>>,
    remaining: usize,
}

impl<'a, K: ?Sized, V: ?Sized, P> Iterator for Iter<'_, 'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&binding) = self.chain.next() {
                self.remaining -= 1;
                return Some(binding);
            }
            self.chain = self.buckets.next()?.into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: ?Sized, V: ?Sized, P> ExactSizeIterator for Iter<'_, '_, K, V, P> {}

/// Iterator over the keys of a [`ChainMap`].
///
/// Created by [`ChainMap::keys`].
pub struct Keys<'m, 'a, K: ?Sized, V: ?Sized, P> {
    inner: Iter<'m, 'a, K, V, P>,
}

impl<'a, K: ?Sized, V: ?Sized, P> Iterator for Keys<'_, 'a, K, V, P> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: ?Sized, V: ?Sized, P> ExactSizeIterator for Keys<'_, '_, K, V, P> {}

/// Iterator over the values of a [`ChainMap`].
///
/// Created by [`ChainMap::values`].
pub struct Values<'m, 'a, K: ?Sized, V: ?Sized, P> {
    inner: Iter<'m, 'a, K, V, P>,
}

impl<'a, K: ?Sized, V: ?Sized, P> Iterator for Values<'_, 'a, K, V, P> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: ?Sized, V: ?Sized, P> ExactSizeIterator for Values<'_, '_, K, V, P> {}
