//! Container combiners: `ToVec`, `ToSet`, `ToHashSet`

use crate::Element;
use crate::collector::CombineFn;
use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;

/// Gather elements into a `Vec` in fold order.
///
/// Under parallel execution of an unordered view, partitions are appended in
/// partition order, which is not emission order. Use
/// [`Collectable::to_vec`](crate::Collectable::to_vec) when emission order matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToVec<T>(pub PhantomData<T>);
impl<T> ToVec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element> CombineFn<T, Vec<T>, Vec<T>> for ToVec<T> {
    fn create(&self) -> Vec<T> {
        Vec::new()
    }

    fn add_input(&self, acc: &mut Vec<T>, v: T) {
        acc.push(v);
    }

    fn merge(&self, acc: &mut Vec<T>, other: Vec<T>) {
        if acc.is_empty() {
            *acc = other;
        } else {
            acc.extend(other);
        }
    }

    fn finish(&self, acc: Vec<T>) -> Vec<T> {
        acc
    }
}

/// Gather distinct elements into a `BTreeSet`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToSet<T>(pub PhantomData<T>);
impl<T> ToSet<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element + Ord> CombineFn<T, BTreeSet<T>, BTreeSet<T>> for ToSet<T> {
    fn create(&self) -> BTreeSet<T> {
        BTreeSet::new()
    }

    fn add_input(&self, acc: &mut BTreeSet<T>, v: T) {
        acc.insert(v);
    }

    fn merge(&self, acc: &mut BTreeSet<T>, mut other: BTreeSet<T>) {
        acc.append(&mut other);
    }

    fn finish(&self, acc: BTreeSet<T>) -> BTreeSet<T> {
        acc
    }
}

/// Gather distinct elements into a `HashSet`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToHashSet<T>(pub PhantomData<T>);
impl<T> ToHashSet<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Element + Eq + Hash> CombineFn<T, HashSet<T>, HashSet<T>> for ToHashSet<T> {
    fn create(&self) -> HashSet<T> {
        HashSet::new()
    }

    fn add_input(&self, acc: &mut HashSet<T>, v: T) {
        acc.insert(v);
    }

    fn merge(&self, acc: &mut HashSet<T>, other: HashSet<T>) {
        if acc.is_empty() {
            *acc = other;
        } else {
            acc.extend(other);
        }
    }

    fn finish(&self, acc: HashSet<T>) -> HashSet<T> {
        acc
    }
}
