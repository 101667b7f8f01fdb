use std::io;
use std::ops::Range;

use roaring::RoaringBitmap;

use crate::unit::Unit;

/// Default unit capacity: the positive range of a 32-bit signed integer.
pub const DEFAULT_CAPACITY: u32 = i32::MAX as u32;

/// A [`Unit`] backed by a [`RoaringBitmap`].
///
/// Wraps the roaring bitmap together with the logical size the unit spans.
/// The const parameter `C` is the unit capacity; positions are restricted
/// to `0..C`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoaringUnit<const C: u32 = DEFAULT_CAPACITY> {
    bitmap: RoaringBitmap,
    size: u64,
}

impl<const C: u32> Eq for RoaringUnit<C> {}

impl<const C: u32> Default for RoaringUnit<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: u32> RoaringUnit<C> {
    /// Create an empty unit with a size of zero.
    pub fn new() -> Self {
        const { assert!(C > 0, "unit capacity must be positive") };

        Self {
            bitmap: RoaringBitmap::new(),
            size: 0,
        }
    }

    /// Wrap an existing roaring bitmap. The size covers its highest value.
    ///
    /// Panics if the bitmap holds a value `>= C`.
    pub fn from_bitmap(bitmap: RoaringBitmap) -> Self {
        Self::with_size(bitmap, 0)
    }

    /// Wrap an existing roaring bitmap with an explicit size.
    ///
    /// The size is clamped to `C` and raised to cover the highest value.
    /// Panics if the bitmap holds a value `>= C`.
    pub fn with_size(bitmap: RoaringBitmap, size: u64) -> Self {
        let covered = match bitmap.max() {
            Some(max) => {
                assert!(max < C, "value {max} out of range for unit capacity {C}");
                max as u64 + 1
            }
            None => 0,
        };

        Self {
            bitmap,
            size: size.min(C as u64).max(covered),
        }
    }

    /// Access the underlying roaring bitmap.
    pub fn as_roaring(&self) -> &RoaringBitmap {
        &self.bitmap
    }

    /// Consume the unit, returning the underlying roaring bitmap.
    pub fn into_roaring(self) -> RoaringBitmap {
        self.bitmap
    }

    #[inline]
    fn local(offset: u64) -> u32 {
        assert!(
            offset < C as u64,
            "offset {offset} out of range for unit capacity {C}"
        );
        offset as u32
    }

    /// Convert an exclusive range to `u32` bounds, or `None` if it is empty.
    fn local_range(range: Range<u64>) -> Option<Range<u32>> {
        if range.start >= range.end {
            return None;
        }
        assert!(
            range.end <= C as u64,
            "range {}..{} out of range for unit capacity {C}",
            range.start,
            range.end
        );
        Some(range.start as u32..range.end as u32)
    }
}

/// Iterator over the set positions of a [`RoaringUnit`].
pub struct RoaringUnitIter<'a> {
    inner: roaring::bitmap::Iter<'a>,
}

impl Iterator for RoaringUnitIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.inner.next().map(u64::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<const C: u32> Unit for RoaringUnit<C> {
    const CAPACITY: u64 = C as u64;

    type Iter<'a> = RoaringUnitIter<'a>;

    fn empty() -> Self {
        Self::new()
    }

    fn add(&mut self, offset: u64) {
        let value = Self::local(offset);
        self.bitmap.insert(value);
        self.extend(offset + 1);
    }

    fn remove(&mut self, offset: u64) {
        self.bitmap.remove(Self::local(offset));
    }

    fn add_range(&mut self, range: Range<u64>) {
        let Some(local) = Self::local_range(range) else {
            return;
        };

        let end = local.end as u64;
        self.bitmap.insert_range(local);
        // Ranges compress best as run containers.
        self.bitmap.optimize();
        self.extend(end);
    }

    fn remove_range(&mut self, range: Range<u64>) {
        let Some(local) = Self::local_range(range) else {
            return;
        };

        self.bitmap.remove_range(local);
        self.bitmap.optimize();
    }

    fn check(&self, offset: u64) -> bool {
        self.bitmap.contains(Self::local(offset))
    }

    fn and(&self, other: &Self) -> Self {
        Self {
            bitmap: &self.bitmap & &other.bitmap,
            size: self.size.min(other.size),
        }
    }

    fn or(&self, other: &Self) -> Self {
        Self {
            bitmap: &self.bitmap | &other.bitmap,
            size: self.size.max(other.size),
        }
    }

    fn xor(&self, other: &Self) -> Self {
        Self {
            bitmap: &self.bitmap ^ &other.bitmap,
            size: self.size.max(other.size),
        }
    }

    fn and_not(&self, other: &Self) -> Self {
        Self {
            bitmap: &self.bitmap - &other.bitmap,
            size: self.size,
        }
    }

    fn not(&self) -> Self {
        let mut full = RoaringBitmap::new();
        if self.size > 0 {
            full.insert_range(0..self.size as u32);
        }

        let mut bitmap = full - &self.bitmap;
        bitmap.optimize();

        Self {
            bitmap,
            size: self.size,
        }
    }

    fn first(&self) -> Option<u64> {
        self.bitmap.min().map(u64::from)
    }

    fn last(&self) -> Option<u64> {
        self.bitmap.max().map(u64::from)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn cardinality(&self) -> u64 {
        self.bitmap.len()
    }

    fn extend(&mut self, new_size: u64) -> bool {
        let new_size = new_size.min(C as u64);
        if new_size > self.size {
            self.size = new_size;
            return true;
        }
        false
    }

    fn iter(&self) -> RoaringUnitIter<'_> {
        RoaringUnitIter {
            inner: self.bitmap.iter(),
        }
    }

    /// Writes the portable roaring format, readable by other roaring
    /// implementations. The logical size is not written.
    fn serialize_into<W: io::Write>(&self, writer: W) -> io::Result<()> {
        self.bitmap.serialize_into(writer)
    }

    /// The size of the returned unit covers its highest value.
    fn deserialize_from<R: io::Read>(reader: R) -> io::Result<Self> {
        let bitmap = RoaringBitmap::deserialize_from(reader)?;

        if let Some(max) = bitmap.max() {
            if max >= C {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("value {max} out of range for unit capacity {C}"),
                ));
            }
        }

        Ok(Self::from_bitmap(bitmap))
    }

    fn serialized_size(&self) -> usize {
        self.bitmap.serialized_size()
    }
}
