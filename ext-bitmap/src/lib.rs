//! Unbounded compressed bitmap built from a sequence of capacity-bounded units.
//!
//! An [`ExtendedBitmap`] shards the `u64` offset space into consecutive
//! windows of [`Unit::CAPACITY`] positions and stores each window in its own
//! [`Unit`]. With the default [`RoaringUnit`] each window is a 31-bit
//! roaring bitmap.
//!
//! ```
//! use ext_bitmap::ExtRoaringBitmap;
//!
//! let mut bitmap = ExtRoaringBitmap::new();
//! bitmap.add_range(1_024_001_002_302..1_024_001_002_312)?;
//!
//! assert_eq!(bitmap.cardinality(), 10);
//! assert_eq!(bitmap.first(), Some(1_024_001_002_302));
//! assert_eq!(bitmap.last(), Some(1_024_001_002_311));
//!
//! let copy = ExtRoaringBitmap::from_bytes(&bitmap.to_bytes()?)?;
//! assert!(copy.iter().eq(bitmap.iter()));
//! # Ok::<(), ext_bitmap::Error>(())
//! ```

mod bitmap;
mod error;
mod iter;
#[cfg(feature = "roaring")]
mod roaring_unit;
#[cfg(feature = "serde")]
mod serde_impl;
mod unit;


pub use bitmap::{ExtendedBitmap, MAX_UNITS};
pub use error::{Error, Result};
pub use iter::Iter;
#[cfg(feature = "roaring")]
pub use roaring_unit::{DEFAULT_CAPACITY, RoaringUnit, RoaringUnitIter};
pub use unit::Unit;

/// An [`ExtendedBitmap`] over roaring units of the default capacity.
#[cfg(feature = "roaring")]
pub type ExtRoaringBitmap = ExtendedBitmap<RoaringUnit>;
