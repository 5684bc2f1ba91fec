//! Fixed-capacity solution sets.

use std::ops::{Deref, DerefMut};

/// A fixed-capacity, stack-allocated set of up to `N` solution records.
///
/// Every solver in the workspace returns its admissible roots in one of
/// these. Unused slots always hold `T::default()`, which for the solution
/// records is the all-zero "no solution" value. The set dereferences to a
/// slice of the filled entries only.
///
/// # Examples
///
/// ```
/// use topkin_core::types::Solutions;
///
/// let mut set: Solutions<f64, 4> = Solutions::new();
/// assert!(set.push(2.5));
/// assert!(set.push(1.5));
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.slots(), &[2.5, 1.5, 0.0, 0.0]);
///
/// let total: f64 = set.iter().sum();
/// assert_eq!(total, 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solutions<T, const N: usize> {
    slots: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Solutions<T, N> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            slots: [T::default(); N],
            len: 0,
        }
    }

    /// Append a record. Returns `false`, leaving the set unchanged, when full.
    pub fn push(&mut self, value: T) -> bool {
        if self.len == N {
            return false;
        }
        self.slots[self.len] = value;
        self.len += 1;
        true
    }

    /// Number of filled entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no entry is filled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Filled entries.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.len]
    }

    /// Filled entries, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.slots[..self.len]
    }

    /// All slots including the zeroed unused ones.
    #[inline]
    pub fn slots(&self) -> &[T; N] {
        &self.slots
    }

    /// Keep the first `len` entries and reset the rest to the default value.
    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.len -= 1;
            self.slots[self.len] = T::default();
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Keep only the entries for which `keep` returns true, preserving order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let mut write = 0;
        for read in 0..self.len {
            if keep(&self.slots[read]) {
                self.slots[write] = self.slots[read];
                write += 1;
            }
        }
        self.truncate(write);
    }

    /// Move the entries into a set of a different capacity, dropping any
    /// that do not fit.
    pub fn resize<const M: usize>(self) -> Solutions<T, M> {
        self.as_slice().iter().copied().collect()
    }
}

impl<T: Copy + Default, const N: usize> Default for Solutions<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const N: usize> Deref for Solutions<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy + Default, const N: usize> DerefMut for Solutions<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Copy + Default, const N: usize> FromIterator<T> for Solutions<T, N> {
    /// Collect up to `N` items; the remainder is discarded.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter.into_iter().take(N) {
            set.push(item);
        }
        set
    }
}

impl<'a, T: Copy + Default, const N: usize> IntoIterator for &'a Solutions<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut set: Solutions<i32, 2> = Solutions::new();
        assert!(set.push(1));
        assert!(set.push(2));
        assert!(!set.push(3));
        assert_eq!(set.as_slice(), &[1, 2]);
        assert_eq!(set.capacity(), 2);
    }

    #[test]
    fn test_truncate_zeroes_slots() {
        let mut set: Solutions<i32, 4> = [5, 6, 7].into_iter().collect();
        set.truncate(1);
        assert_eq!(set.len(), 1);
        assert_eq!(set.slots(), &[5, 0, 0, 0]);
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut set: Solutions<i32, 4> = [1, 2, 3, 4].into_iter().collect();
        set.retain(|&x| x % 2 == 0);
        assert_eq!(set.as_slice(), &[2, 4]);
        assert_eq!(set.slots(), &[2, 4, 0, 0]);
    }

    #[test]
    fn test_collect_discards_overflow() {
        let set: Solutions<i32, 2> = (1..10).collect();
        assert_eq!(set.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_resize() {
        let set: Solutions<i32, 4> = [1, 2, 3].into_iter().collect();
        let small: Solutions<i32, 2> = set.resize();
        assert_eq!(small.as_slice(), &[1, 2]);
        let big: Solutions<i32, 8> = small.resize();
        assert_eq!(big.len(), 2);
    }

    #[test]
    fn test_deref_mut_sorts_filled_only() {
        let mut set: Solutions<i32, 4> = [3, 1, 2].into_iter().collect();
        set.sort();
        assert_eq!(set.slots(), &[1, 2, 3, 0]);
    }
}
