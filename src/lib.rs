#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(all(test, not(feature = "std")))]
extern crate std;

/// A separately chained hash map of borrowed keys and values.
///
/// This module provides `ChainMap`, whose bucket array and collision chains
/// are both `Sequence`s, together with the strategies that place keys into
/// buckets.
pub mod chain_map;

pub mod error;

pub mod policy;

/// A growable and shrinkable ordered sequence.
///
/// This module provides `Sequence`, the resizing primitive `ChainMap` is
/// built from.
pub mod sequence;

#[cfg(test)]
mod proptests;

pub use chain_map::BucketIndex;
pub use chain_map::ChainMap;
#[cfg(any(feature = "foldhash", feature = "std"))]
pub use chain_map::DefaultHashBuilder;
pub use chain_map::FnIndex;
pub use error::Error;
pub use policy::DEFAULT_SIZE;
pub use policy::SIZE_DOWN_SCALE;
pub use policy::SIZE_DOWN_TRIGGER;
pub use policy::SIZE_UP_SCALE;
pub use sequence::Sequence;
