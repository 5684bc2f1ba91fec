//! Stable sorting by an extracted floating-point key.

/// Stable in-place sort of `items` by `key`, ascending.
///
/// Keys are compared with [`f64::total_cmp`], so NaN keys sort after every
/// finite key instead of poisoning the order. Records with equal keys keep
/// their relative order.
///
/// # Examples
///
/// ```
/// use topkin_core::math::sorting::sort_by_key_f64;
///
/// let mut pairs = [(3.0, 'a'), (1.0, 'b'), (3.0, 'c'), (2.0, 'd')];
/// sort_by_key_f64(&mut pairs, |p| p.0);
/// assert_eq!(pairs.map(|p| p.1), ['b', 'd', 'a', 'c']);
/// ```
pub fn sort_by_key_f64<T, F>(items: &mut [T], mut key: F)
where
    F: FnMut(&T) -> f64,
{
    items.sort_by(|a, b| key(a).total_cmp(&key(b)));
}
