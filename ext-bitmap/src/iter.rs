use std::iter::FusedIterator;

use crate::unit::Unit;

/// Iterator over the set offsets of an
/// [`ExtendedBitmap`](crate::ExtendedBitmap), in ascending order.
///
/// Walks the units front to back, creating each unit's iterator only when
/// the walk reaches it, and shifts every local value by the unit's base
/// offset. Each call to `ExtendedBitmap::iter` starts an independent walk.
pub struct Iter<'a, U: Unit> {
    units: &'a [U],
    /// Index of the unit currently being walked.
    index: usize,
    /// Iterator over `units[index]`, created on first use.
    current: Option<U::Iter<'a>>,
    exhausted: bool,
}

impl<'a, U: Unit> Iter<'a, U> {
    pub(crate) fn new(units: &'a [U]) -> Self {
        Self {
            units,
            index: 0,
            current: None,
            exhausted: units.is_empty(),
        }
    }
}

impl<U: Unit> Iterator for Iter<'_, U> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let units = self.units;

        while !self.exhausted {
            let inner = self
                .current
                .get_or_insert_with(|| units[self.index].iter());

            if let Some(value) = inner.next() {
                return Some(self.index as u64 * U::CAPACITY + value);
            }

            self.current = None;
            self.index += 1;
            self.exhausted = self.index >= units.len();
        }

        None
    }
}

impl<U: Unit> FusedIterator for Iter<'_, U> {}
