use std::io;
use std::ops::Range;

/// A capacity-bounded bitmap that can serve as one shard of an
/// [`ExtendedBitmap`](crate::ExtendedBitmap).
///
/// A unit addresses the local positions `0..CAPACITY`. Besides its set bits
/// it tracks a logical *size*: the exclusive upper bound of the positions it
/// is considered to span. Insertions grow the size to cover the inserted
/// positions, [`Unit::extend`] grows it explicitly, and nothing ever shrinks
/// it. The size bounds [`Unit::not`].
///
/// Callers must pass local offsets below `CAPACITY`. Implementations are
/// free to panic otherwise.
pub trait Unit: Clone {
    /// The number of positions a single unit can address.
    const CAPACITY: u64;

    /// Iterator over the set positions of a unit, in ascending order.
    type Iter<'a>: Iterator<Item = u64>
    where
        Self: 'a;

    /// Create a unit with no bits set and a size of zero.
    fn empty() -> Self;

    /// Set the bit at `offset`.
    fn add(&mut self, offset: u64);

    /// Clear the bit at `offset`. No-op if it is not set.
    fn remove(&mut self, offset: u64);

    /// Set every bit in `range`. Empty ranges are ignored.
    fn add_range(&mut self, range: Range<u64>);

    /// Clear every bit in `range`. Empty ranges are ignored.
    fn remove_range(&mut self, range: Range<u64>);

    /// Test whether the bit at `offset` is set.
    fn check(&self, offset: u64) -> bool;

    /// Intersection. The result spans the smaller of the two sizes.
    fn and(&self, other: &Self) -> Self;

    /// Union. The result spans the larger of the two sizes.
    fn or(&self, other: &Self) -> Self;

    /// Symmetric difference. The result spans the larger of the two sizes.
    fn xor(&self, other: &Self) -> Self;

    /// Difference. The result keeps the size of `self`.
    fn and_not(&self, other: &Self) -> Self;

    /// Complement within `0..self.size()`.
    fn not(&self) -> Self;

    /// The lowest set position, or `None` if no bit is set.
    fn first(&self) -> Option<u64>;

    /// The highest set position, or `None` if no bit is set.
    fn last(&self) -> Option<u64>;

    /// The logical size of the unit.
    fn size(&self) -> u64;

    /// The number of set bits.
    fn cardinality(&self) -> u64;

    /// Grow the logical size to `new_size`, clamped to `CAPACITY`.
    ///
    /// Returns `true` if the size changed. Shrinking is never performed.
    fn extend(&mut self, new_size: u64) -> bool;

    /// Iterate over set positions in ascending order.
    fn iter(&self) -> Self::Iter<'_>;

    /// Write the unit's serialized form.
    fn serialize_into<W: io::Write>(&self, writer: W) -> io::Result<()>;

    /// Read a unit previously written by [`Unit::serialize_into`].
    fn deserialize_from<R: io::Read>(reader: R) -> io::Result<Self>;

    /// The number of bytes [`Unit::serialize_into`] writes.
    fn serialized_size(&self) -> usize;
}
