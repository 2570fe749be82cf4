//! Keyed combiners: `ToMap`, `GroupBy`

use crate::Element;
use crate::collector::CombineFn;
use std::collections::BTreeMap;
use std::sync::Arc;

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;
type ValueFn<T, V> = Arc<dyn Fn(&T) -> V + Send + Sync>;

/// Map each element to a `(key, value)` entry; a repeated key keeps the
/// value folded last.
///
/// Fold order is emission order only when the run is sequential. Use
/// [`Collectable::to_map`](crate::Collectable::to_map) for "last in emission
/// order" under parallel execution too.
pub struct ToMap<T, K, V> {
    key: KeyFn<T, K>,
    value: ValueFn<T, V>,
}

impl<T, K, V> Clone for ToMap<T, K, V> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T, K, V> ToMap<T, K, V> {
    pub fn new<KF, VF>(key: KF, value: VF) -> Self
    where
        KF: Fn(&T) -> K + Send + Sync + 'static,
        VF: Fn(&T) -> V + Send + Sync + 'static,
    {
        Self {
            key: Arc::new(key),
            value: Arc::new(value),
        }
    }
}

impl<T, K, V> CombineFn<T, BTreeMap<K, V>, BTreeMap<K, V>> for ToMap<T, K, V>
where
    T: Element,
    K: Element + Ord,
    V: Element,
{
    fn create(&self) -> BTreeMap<K, V> {
        BTreeMap::new()
    }

    fn add_input(&self, acc: &mut BTreeMap<K, V>, v: T) {
        acc.insert((self.key)(&v), (self.value)(&v));
    }

    fn merge(&self, acc: &mut BTreeMap<K, V>, mut other: BTreeMap<K, V>) {
        acc.append(&mut other);
    }

    fn finish(&self, acc: BTreeMap<K, V>) -> BTreeMap<K, V> {
        acc
    }
}

/// Group elements under a key; each group keeps fold order.
pub struct GroupBy<T, K> {
    key: KeyFn<T, K>,
}

impl<T, K> Clone for GroupBy<T, K> {
    fn clone(&self) -> Self {
        Self { key: Arc::clone(&self.key) }
    }
}

impl<T, K> GroupBy<T, K> {
    pub fn new<KF>(key: KF) -> Self
    where
        KF: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self { key: Arc::new(key) }
    }
}

impl<T, K> CombineFn<T, BTreeMap<K, Vec<T>>, BTreeMap<K, Vec<T>>> for GroupBy<T, K>
where
    T: Element,
    K: Element + Ord,
{
    fn create(&self) -> BTreeMap<K, Vec<T>> {
        BTreeMap::new()
    }

    fn add_input(&self, acc: &mut BTreeMap<K, Vec<T>>, v: T) {
        acc.entry((self.key)(&v)).or_default().push(v);
    }

    fn merge(&self, acc: &mut BTreeMap<K, Vec<T>>, other: BTreeMap<K, Vec<T>>) {
        for (k, mut vs) in other {
            acc.entry(k).or_default().append(&mut vs);
        }
    }

    fn finish(&self, acc: BTreeMap<K, Vec<T>>) -> BTreeMap<K, Vec<T>> {
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_merges_partials_per_key() {
        let g = GroupBy::new(|v: &u32| v % 2);
        let mut left = g.create();
        let mut right = g.create();
        for v in [1, 2, 3] {
            g.add_input(&mut left, v);
        }
        for v in [4, 5] {
            g.add_input(&mut right, v);
        }
        g.merge(&mut left, right);
        let out = g.finish(left);
        assert_eq!(out[&0], vec![2, 4]);
        assert_eq!(out[&1], vec![1, 3, 5]);
    }

    #[test]
    fn to_map_keeps_later_value() {
        let m = ToMap::new(|s: &(u8, char)| s.0, |s: &(u8, char)| s.1);
        let mut acc = m.create();
        m.add_input(&mut acc, (1, 'a'));
        m.add_input(&mut acc, (1, 'b'));
        assert_eq!(m.finish(acc).get(&1), Some(&'b'));
    }
}
