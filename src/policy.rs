//! Resize policy shared by [`Sequence`](crate::Sequence) and
//! [`ChainMap`](crate::ChainMap).
//!
//! Both containers grow geometrically and shrink with hysteresis: storage is
//! multiplied by [`ResizePolicy::UP_SCALE`] when it is full, and divided by
//! [`ResizePolicy::DOWN_SCALE`] once fewer than one slot in
//! [`ResizePolicy::DOWN_TRIGGER`] would remain occupied.

/// Growth multiplier of the default policy.
pub const SIZE_UP_SCALE: usize = 2;

/// Occupancy-ratio denominator that triggers a shrink in the default policy.
pub const SIZE_DOWN_TRIGGER: usize = 4;

/// Shrink divisor of the default policy.
pub const SIZE_DOWN_SCALE: usize = 2;

/// Bucket count of a freshly created map under the default policy.
pub const DEFAULT_SIZE: usize = 1;

/// Compile-time resize policy.
///
/// Implementors only override the constants they want to change. A policy is
/// checked when a container using it is constructed; an inconsistent policy
/// is a compile error rather than a runtime failure.
///
/// ```rust
/// use chain_hash::Sequence;
/// use chain_hash::policy::ResizePolicy;
///
/// struct Eager;
///
/// impl ResizePolicy for Eager {
///     const UP_SCALE: usize = 4;
///     const DOWN_TRIGGER: usize = 16;
///     const DOWN_SCALE: usize = 4;
/// }
///
/// let mut seq: Sequence<u32, Eager> = Sequence::with_policy();
/// seq.push_back(1);
/// assert_eq!(seq.capacity(), 4);
/// ```
pub trait ResizePolicy {
    /// Factor applied to a full container's capacity. The first allocation of
    /// an empty [`Sequence`](crate::Sequence) is exactly this many slots.
    const UP_SCALE: usize = SIZE_UP_SCALE;

    /// Shrink once `DOWN_TRIGGER * remaining < capacity`.
    const DOWN_TRIGGER: usize = SIZE_DOWN_TRIGGER;

    /// Divisor applied to the capacity on shrink.
    const DOWN_SCALE: usize = SIZE_DOWN_SCALE;

    /// Bucket count of a new or cleared [`ChainMap`](crate::ChainMap).
    const INITIAL_BUCKETS: usize = DEFAULT_SIZE;

    #[doc(hidden)]
    const ASSERT_VALID: () = {
        assert!(Self::UP_SCALE >= 2, "UP_SCALE must be at least 2");
        assert!(Self::DOWN_SCALE >= 2, "DOWN_SCALE must be at least 2");
        assert!(
            Self::DOWN_TRIGGER >= Self::UP_SCALE * Self::DOWN_SCALE,
            "DOWN_TRIGGER must be at least UP_SCALE * DOWN_SCALE"
        );
        assert!(Self::INITIAL_BUCKETS >= 1, "INITIAL_BUCKETS must be non-zero");
    };
}

/// The policy both containers use unless told otherwise: double on growth,
/// halve when under a quarter full, start with a single bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultPolicy;

impl ResizePolicy for DefaultPolicy {}

#[inline(always)]
pub(crate) fn grown<P: ResizePolicy>(capacity: usize) -> Option<usize> {
    if capacity == 0 {
        Some(P::UP_SCALE)
    } else {
        capacity.checked_mul(P::UP_SCALE)
    }
}

/// Whether `capacity` should shrink once only `remaining` elements are left.
#[inline(always)]
pub(crate) fn should_shrink<P: ResizePolicy>(remaining: usize, capacity: usize) -> bool {
    remaining.saturating_mul(P::DOWN_TRIGGER) < capacity
}

#[inline(always)]
pub(crate) fn shrunk<P: ResizePolicy>(capacity: usize) -> usize {
    capacity / P::DOWN_SCALE
}
