use std::io::{self, Read, Write};
use std::ops::{BitAnd, BitOr, BitXor, Not, Range, Sub};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::iter::Iter;
use crate::unit::Unit;

/// Maximum number of units an extended bitmap may hold.
pub const MAX_UNITS: u64 = i32::MAX as u64;

/// Byte that ends a serialized unit sequence when it appears in place of a
/// continuation marker.
const TERMINATOR: u8 = 0xFF;

/// An unbounded bitmap built from an ordered sequence of bounded units.
///
/// The unit at index `i` covers the offsets `[i * C, (i + 1) * C)` where
/// `C` is [`Unit::CAPACITY`]. Units are appended on demand as offsets
/// beyond the current range are inserted, and are never removed.
///
/// Every unit except the last one spans its full capacity, so the logical
/// size of the bitmap is `(units - 1) * C + last.size()`. Every append
/// first extends the current last unit to full capacity to keep it so.
///
/// Set operations borrow their operands and build a new, independently
/// owned unit sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedBitmap<U> {
    units: Vec<U>,
}

impl<U: Unit> Default for ExtendedBitmap<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Unit> ExtendedBitmap<U> {
    /// Create an empty bitmap with no units.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Build a bitmap from an ordered sequence of units.
    ///
    /// Each unit but the last is extended to its full capacity.
    pub fn from_units(units: impl IntoIterator<Item = U>) -> Self {
        let mut bitmap = Self::new();
        for unit in units {
            Self::push_unit(&mut bitmap.units, unit);
        }
        bitmap
    }

    /// The exclusive upper bound on offsets accepted by insertions.
    pub fn limit() -> u64 {
        U::CAPACITY.saturating_mul(MAX_UNITS)
    }

    /// The units backing this bitmap, in offset order.
    pub fn units(&self) -> &[U] {
        &self.units
    }

    /// The number of allocated units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Set the bit at `offset`, allocating units as needed.
    pub fn add(&mut self, offset: u64) -> Result<()> {
        Self::check_offset(offset)?;

        let (index, local) = Self::locate(offset);
        let index = index as usize;
        self.grow_to(index);
        self.units[index].add(local);
        Ok(())
    }

    /// Clear the bit at `offset`.
    ///
    /// Offsets past the allocated units are not set by definition, so this
    /// is a no-op for them.
    pub fn remove(&mut self, offset: u64) {
        let (index, local) = Self::locate(offset);
        if let Some(unit) = self.unit_mut(index) {
            unit.remove(local);
        }
    }

    /// Set every bit in `range`.
    ///
    /// Fails with [`Error::InvalidRange`] if the range is empty and with
    /// [`Error::OffsetOutOfRange`] if its end reaches [`Self::limit`].
    /// Nothing is modified on failure.
    pub fn add_range(&mut self, range: Range<u64>) -> Result<()> {
        let Range { start, end } = range;
        if start >= end {
            return Err(Error::InvalidRange { start, end });
        }
        Self::check_offset(end)?;

        let first = (start / U::CAPACITY) as usize;
        let last = ((end - 1) / U::CAPACITY) as usize;
        self.grow_to(last);

        for (index, unit) in self.units[first..=last].iter_mut().enumerate() {
            let base = (first + index) as u64 * U::CAPACITY;
            unit.add_range(Self::clamp(base, start, end));
        }
        Ok(())
    }

    /// Clear every bit in `range`.
    ///
    /// Unlike [`Self::add_range`], an empty range is silently ignored.
    /// Only allocated units are visited; no units are appended.
    pub fn remove_range(&mut self, range: Range<u64>) {
        let Range { start, end } = range;
        if start >= end {
            return;
        }

        let first = usize::try_from(start / U::CAPACITY).unwrap_or(usize::MAX);
        for (index, unit) in self.units.iter_mut().enumerate().skip(first) {
            let base = index as u64 * U::CAPACITY;
            if base >= end {
                break;
            }
            unit.remove_range(Self::clamp(base, start, end));
        }
    }

    /// Test whether the bit at `offset` is set.
    pub fn check(&self, offset: u64) -> bool {
        let (index, local) = Self::locate(offset);
        self.unit(index).is_some_and(|unit| unit.check(local))
    }

    /// The lowest set offset, or `None` if no bit is set.
    pub fn first(&self) -> Option<u64> {
        self.units
            .iter()
            .enumerate()
            .find_map(|(index, unit)| Some(index as u64 * U::CAPACITY + unit.first()?))
    }

    /// The highest set offset, or `None` if no bit is set.
    pub fn last(&self) -> Option<u64> {
        self.units
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, unit)| Some(index as u64 * U::CAPACITY + unit.last()?))
    }

    /// The logical size: the offset one past the end of the spanned range.
    pub fn size(&self) -> u64 {
        match self.units.split_last() {
            Some((last, rest)) => rest.len() as u64 * U::CAPACITY + last.size(),
            None => 0,
        }
    }

    /// The number of set bits.
    pub fn cardinality(&self) -> u64 {
        self.units.iter().map(Unit::cardinality).sum()
    }

    /// Returns `true` if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.units.iter().all(|unit| unit.cardinality() == 0)
    }

    /// Grow the logical size to `new_size`.
    ///
    /// Returns `true` if the size changed. Growth is monotonic: a
    /// `new_size` at or below the current size leaves the bitmap untouched.
    pub fn extend(&mut self, new_size: u64) -> Result<bool> {
        if new_size == 0 {
            return Ok(false);
        }
        let limit = Self::limit();
        if new_size > limit {
            return Err(Error::OffsetOutOfRange {
                offset: new_size,
                limit,
            });
        }

        let before = self.units.len();
        self.grow_to(((new_size - 1) / U::CAPACITY) as usize);
        let mut extended = self.units.len() != before;

        for (index, unit) in self.units.iter_mut().enumerate() {
            let base = index as u64 * U::CAPACITY;
            if new_size > base {
                extended |= unit.extend(new_size - base);
            }
        }
        Ok(extended)
    }

    /// Intersection. The result has as many units as the shorter operand.
    pub fn and(&self, other: &Self) -> Self {
        let mut units = Vec::with_capacity(self.units.len().min(other.units.len()));
        for (lhs, rhs) in self.units.iter().zip(&other.units) {
            Self::push_unit(&mut units, lhs.and(rhs));
        }
        Self { units }
    }

    /// Union. The result has as many units as the longer operand.
    pub fn or(&self, other: &Self) -> Self {
        self.combine_padded(other, U::or)
    }

    /// Symmetric difference. The result has as many units as the longer
    /// operand.
    pub fn xor(&self, other: &Self) -> Self {
        self.combine_padded(other, U::xor)
    }

    /// Difference: the bits of `self` that are not set in `other`.
    pub fn and_not(&self, other: &Self) -> Self {
        let mut units = Vec::with_capacity(self.units.len());
        for (index, unit) in self.units.iter().enumerate() {
            let result = match other.units.get(index) {
                Some(rhs) => unit.and_not(rhs),
                None => unit.clone(),
            };
            Self::push_unit(&mut units, result);
        }
        Self { units }
    }

    /// Complement within the allocated range.
    ///
    /// Each unit is complemented within its own size, so offsets at or past
    /// [`Self::size`] stay clear. This is not the complement over the
    /// unbounded domain: the result depends on how far the bitmap has been
    /// extended, and `not` does not commute with [`Self::extend`].
    pub fn not(&self) -> Self {
        let mut units = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            Self::push_unit(&mut units, unit.not());
        }
        Self { units }
    }

    /// Iterate over set offsets in ascending order.
    pub fn iter(&self) -> Iter<'_, U> {
        Iter::new(&self.units)
    }

    /// Place `unit` at `index`, bypassing offset translation.
    ///
    /// Past the current end, empty units fill the gap and `unit` is
    /// appended. Otherwise the unit at `index` is replaced; a replacement
    /// that is not the last unit is extended to its full capacity.
    pub fn put_unit(&mut self, index: usize, mut unit: U) -> Result<()> {
        if index as u64 >= MAX_UNITS {
            return Err(Error::OffsetOutOfRange {
                offset: (index as u64).saturating_mul(U::CAPACITY),
                limit: Self::limit(),
            });
        }

        if index >= self.units.len() {
            while self.units.len() < index {
                Self::push_unit(&mut self.units, U::empty());
            }
            Self::push_unit(&mut self.units, unit);
            return Ok(());
        }

        if index + 1 < self.units.len() {
            unit.extend(U::CAPACITY);
        }
        let replaced = std::mem::replace(&mut self.units[index], unit);
        if replaced.cardinality() > 0 {
            warn!(
                index,
                cardinality = replaced.cardinality(),
                "replaced a non-empty unit"
            );
        }
        Ok(())
    }

    /// Write the bitmap to `writer`.
    ///
    /// Wire format: the serialized units in order, with a one-byte
    /// continuation marker after every unit but the last. The marker after
    /// unit `i` is `i % 255`, so it never equals the terminator `0xFF`. An
    /// empty bitmap writes nothing.
    pub fn serialize_into<W: Write>(&self, mut writer: W) -> Result<()> {
        let last = self.units.len().saturating_sub(1);
        for (index, unit) in self.units.iter().enumerate() {
            unit.serialize_into(&mut writer)?;
            if index < last {
                writer.write_all(&[(index % 255) as u8])?;
            }
        }
        Ok(())
    }

    /// Read a bitmap written by [`Self::serialize_into`].
    ///
    /// Reading stops after a unit that is followed by the end of the stream
    /// or by the byte `0xFF`.
    pub fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let Some(head) = read_byte(&mut reader)? else {
            return Ok(Self::new());
        };

        let mut units = Vec::new();
        let mut unit = U::deserialize_from([head].as_slice().chain(&mut reader))?;
        loop {
            Self::push_unit(&mut units, unit);
            match read_byte(&mut reader)? {
                None | Some(TERMINATOR) => break,
                Some(_) => unit = U::deserialize_from(&mut reader)?,
            }
        }

        let bitmap = Self { units };
        debug!(
            units = bitmap.units.len(),
            cardinality = bitmap.cardinality(),
            "deserialized extended bitmap"
        );
        Ok(bitmap)
    }

    /// Serialize into a new byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut buf)?;
        Ok(buf)
    }

    /// Deserialize from a byte slice produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::deserialize_from(bytes)
    }

    /// The number of bytes [`Self::serialize_into`] writes.
    pub fn serialized_size(&self) -> usize {
        let units: usize = self.units.iter().map(Unit::serialized_size).sum();
        units + self.units.len().saturating_sub(1)
    }

    /// Append `unit` to `units`, first extending the current last unit to
    /// full capacity. All appends go through here.
    fn push_unit(units: &mut Vec<U>, unit: U) {
        if let Some(last) = units.last_mut() {
            last.extend(U::CAPACITY);
        }
        units.push(unit);
        trace!(units = units.len(), "appended unit");
    }

    /// Append empty units until `index` is addressable.
    fn grow_to(&mut self, index: usize) {
        while self.units.len() <= index {
            Self::push_unit(&mut self.units, U::empty());
        }
    }

    fn combine_padded(&self, other: &Self, op: impl Fn(&U, &U) -> U) -> Self {
        let count = self.units.len().max(other.units.len());
        let empty = U::empty();

        let mut units = Vec::with_capacity(count);
        for index in 0..count {
            let lhs = self.units.get(index).unwrap_or(&empty);
            let rhs = other.units.get(index).unwrap_or(&empty);
            Self::push_unit(&mut units, op(lhs, rhs));
        }
        Self { units }
    }

    fn unit(&self, index: u64) -> Option<&U> {
        self.units.get(usize::try_from(index).ok()?)
    }

    fn unit_mut(&mut self, index: u64) -> Option<&mut U> {
        self.units.get_mut(usize::try_from(index).ok()?)
    }

    /// Split a global offset into `(unit index, local offset)`.
    #[inline]
    fn locate(offset: u64) -> (u64, u64) {
        (offset / U::CAPACITY, offset % U::CAPACITY)
    }

    /// The part of `[start, end)` that falls into the unit at `base`, in
    /// local offsets.
    #[inline]
    fn clamp(base: u64, start: u64, end: u64) -> Range<u64> {
        start.saturating_sub(base)..(end - base).min(U::CAPACITY)
    }

    fn check_offset(offset: u64) -> Result<()> {
        let limit = Self::limit();
        if offset >= limit {
            return Err(Error::OffsetOutOfRange { offset, limit });
        }
        Ok(())
    }
}

/// Read a single byte, returning `None` at the end of the stream.
fn read_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

impl<'a, U: Unit> IntoIterator for &'a ExtendedBitmap<U> {
    type Item = u64;
    type IntoIter = Iter<'a, U>;

    fn into_iter(self) -> Iter<'a, U> {
        self.iter()
    }
}

impl<U: Unit> BitAnd for &ExtendedBitmap<U> {
    type Output = ExtendedBitmap<U>;

    fn bitand(self, rhs: Self) -> ExtendedBitmap<U> {
        self.and(rhs)
    }
}

impl<U: Unit> BitOr for &ExtendedBitmap<U> {
    type Output = ExtendedBitmap<U>;

    fn bitor(self, rhs: Self) -> ExtendedBitmap<U> {
        self.or(rhs)
    }
}

impl<U: Unit> BitXor for &ExtendedBitmap<U> {
    type Output = ExtendedBitmap<U>;

    fn bitxor(self, rhs: Self) -> ExtendedBitmap<U> {
        self.xor(rhs)
    }
}

impl<U: Unit> Sub for &ExtendedBitmap<U> {
    type Output = ExtendedBitmap<U>;

    fn sub(self, rhs: Self) -> ExtendedBitmap<U> {
        self.and_not(rhs)
    }
}

impl<U: Unit> Not for &ExtendedBitmap<U> {
    type Output = ExtendedBitmap<U>;

    fn not(self) -> ExtendedBitmap<U> {
        ExtendedBitmap::not(self)
    }
}
