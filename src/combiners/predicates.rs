//! Short-circuiting combiners: `AnyMatch`, `AllMatch`, `Joining`

use crate::collector::CombineFn;
use crate::format::render;
use std::sync::Arc;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// `true` when some element satisfies the predicate. A partition stops as
/// soon as its accumulator turns `true`.
pub struct AnyMatch<T> {
    pred: Predicate<T>,
}

impl<T> AnyMatch<T> {
    pub fn new<P>(pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self { pred: Arc::new(pred) }
    }
}

impl<T: 'static> CombineFn<T, bool, bool> for AnyMatch<T> {
    fn create(&self) -> bool {
        false
    }

    fn add_input(&self, acc: &mut bool, v: T) {
        *acc = *acc || (self.pred)(&v);
    }

    fn merge(&self, acc: &mut bool, other: bool) {
        *acc |= other;
    }

    fn finish(&self, acc: bool) -> bool {
        acc
    }

    fn is_done(&self, acc: &bool) -> bool {
        *acc
    }
}

/// `true` when every element satisfies the predicate (vacuously on empty
/// input). Stops at the first counterexample.
pub struct AllMatch<T> {
    pred: Predicate<T>,
}

impl<T> AllMatch<T> {
    pub fn new<P>(pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self { pred: Arc::new(pred) }
    }
}

impl<T: 'static> CombineFn<T, bool, bool> for AllMatch<T> {
    fn create(&self) -> bool {
        true
    }

    fn add_input(&self, acc: &mut bool, v: T) {
        *acc = *acc && (self.pred)(&v);
    }

    fn merge(&self, acc: &mut bool, other: bool) {
        *acc &= other;
    }

    fn finish(&self, acc: bool) -> bool {
        acc
    }

    fn is_done(&self, acc: &bool) -> bool {
        !*acc
    }
}

/// Render elements with their `Display` impl as `prefix e0 delim e1 ... suffix`.
///
/// Elements are rendered as they are folded; partials concatenate in
/// partition order.
#[derive(Clone, Debug)]
pub struct Joining {
    prefix: String,
    delimiter: String,
    suffix: String,
}

impl Default for Joining {
    fn default() -> Self {
        Self::new("[", ",", "]")
    }
}

impl Joining {
    pub fn new(prefix: impl Into<String>, delimiter: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: delimiter.into(),
            suffix: suffix.into(),
        }
    }
}

impl<T: std::fmt::Display> CombineFn<T, Vec<String>, String> for Joining {
    fn create(&self) -> Vec<String> {
        Vec::new()
    }

    fn add_input(&self, acc: &mut Vec<String>, v: T) {
        acc.push(v.to_string());
    }

    fn merge(&self, acc: &mut Vec<String>, mut other: Vec<String>) {
        acc.append(&mut other);
    }

    fn finish(&self, acc: Vec<String>) -> String {
        render(&acc, &self.prefix, &self.delimiter, &self.suffix, String::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_and_all_report_done() {
        let any = AnyMatch::new(|v: &i32| *v > 2);
        let mut acc = any.create();
        any.add_input(&mut acc, 1);
        assert!(!any.is_done(&acc));
        any.add_input(&mut acc, 3);
        assert!(any.is_done(&acc));

        let all = AllMatch::new(|v: &i32| *v > 0);
        let mut acc = all.create();
        all.add_input(&mut acc, 1);
        assert!(!all.is_done(&acc));
        all.add_input(&mut acc, -1);
        assert!(all.is_done(&acc) && !all.finish(acc));
    }

    #[test]
    fn joining_uses_frame() {
        let j = Joining::new("<", "|", ">");
        let mut acc = CombineFn::<u8, _, _>::create(&j);
        j.add_input(&mut acc, 1u8);
        j.add_input(&mut acc, 2u8);
        assert_eq!(CombineFn::<u8, _, _>::finish(&j, acc), "<1|2>");
    }
}
