//! Terminal operations. Each one replays the full queue from the source and
//! then consumes the resulting sequence.

use crate::error::Result;
use crate::invoke::guarded;
use crate::pipeline::Stream;
use std::collections::HashMap;
use std::hash::Hash;

impl<S: Clone + 'static, T: 'static> Stream<S, T> {
    /// Materialize the result into a new `Vec`
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.evaluate("to_vec")
    }

    /// Append the result to `dest`, returning how many elements were written
    pub fn collect_into<C: Extend<T>>(&self, dest: &mut C) -> Result<usize> {
        let items = self.evaluate("collect_into")?;
        let written = items.len();
        dest.extend(items);
        Ok(written)
    }

    /// Run the queue for its side effects only
    pub fn exec(&self) -> Result<()> {
        self.evaluate("exec").map(|_| ())
    }

    /// Call `action` on every element in order
    pub fn for_each(&self, mut action: impl FnMut(T)) -> Result<()> {
        let items = self.evaluate("for_each")?;
        guarded("for_each", || {
            items.into_iter().for_each(&mut action);
            Ok(())
        })
    }

    /// Call `action` on every element together with its position
    pub fn for_each_indexed(&self, mut action: impl FnMut(T, usize)) -> Result<()> {
        let items = self.evaluate("for_each_indexed")?;
        guarded("for_each_indexed", || {
            for (i, item) in items.into_iter().enumerate() {
                action(item, i);
            }
            Ok(())
        })
    }

    /// True when every element matches; true on an empty sequence
    pub fn all_match(&self, mut pred: impl FnMut(&T) -> bool) -> Result<bool> {
        self.position("all_match", |item, _| !pred(item))
            .map(|found| found.is_none())
    }

    /// Like [`Stream::all_match`], with positions
    pub fn all_match_indexed(&self, mut pred: impl FnMut(&T, usize) -> bool) -> Result<bool> {
        self.position("all_match_indexed", |item, i| !pred(item, i))
            .map(|found| found.is_none())
    }

    /// True when some element matches; false on an empty sequence
    pub fn any_match(&self, mut pred: impl FnMut(&T) -> bool) -> Result<bool> {
        self.position("any_match", |item, _| pred(item))
            .map(|found| found.is_some())
    }

    /// Like [`Stream::any_match`], with positions
    pub fn any_match_indexed(&self, pred: impl FnMut(&T, usize) -> bool) -> Result<bool> {
        self.position("any_match_indexed", pred)
            .map(|found| found.is_some())
    }

    /// True when no element matches; true on an empty sequence
    pub fn none_match(&self, mut pred: impl FnMut(&T) -> bool) -> Result<bool> {
        self.position("none_match", |item, _| pred(item))
            .map(|found| found.is_none())
    }

    /// Like [`Stream::none_match`], with positions
    pub fn none_match_indexed(&self, pred: impl FnMut(&T, usize) -> bool) -> Result<bool> {
        self.position("none_match_indexed", pred)
            .map(|found| found.is_none())
    }

    /// Number of elements in the result
    pub fn count(&self) -> Result<usize> {
        self.evaluate("count").map(|items| items.len())
    }

    /// Largest element under a strict less-than comparator; `None` when empty
    pub fn max(&self, less: impl Fn(&T, &T) -> bool) -> Result<Option<T>> {
        let items = self.evaluate("max")?;
        guarded("max", || Ok(scan_best(items, |best, item| less(best, item))))
    }

    /// Smallest element under a strict less-than comparator; `None` when empty
    pub fn min(&self, less: impl Fn(&T, &T) -> bool) -> Result<Option<T>> {
        let items = self.evaluate("min")?;
        guarded("min", || Ok(scan_best(items, |best, item| less(item, best))))
    }

    /// First element from the front that matches
    pub fn first(&self, mut pred: impl FnMut(&T) -> bool) -> Result<Option<T>> {
        let items = self.evaluate("first")?;
        guarded("first", || Ok(items.into_iter().find(|item| pred(item))))
    }

    /// First element from the back that matches
    pub fn last(&self, mut pred: impl FnMut(&T) -> bool) -> Result<Option<T>> {
        let items = self.evaluate("last")?;
        guarded("last", || Ok(items.into_iter().rev().find(|item| pred(item))))
    }

    /// Fold the result into `init` with `f(acc, element)`
    pub fn reduce<A>(&self, init: A, mut f: impl FnMut(A, T) -> A) -> Result<A> {
        let items = self.evaluate("reduce")?;
        guarded("reduce", || Ok(items.into_iter().fold(init, &mut f)))
    }

    /// Fold with `f(acc, element, position)`
    pub fn reduce_indexed<A>(&self, init: A, mut f: impl FnMut(A, T, usize) -> A) -> Result<A> {
        let items = self.evaluate("reduce_indexed")?;
        guarded("reduce_indexed", || {
            Ok(items
                .into_iter()
                .enumerate()
                .fold(init, |acc, (i, item)| f(acc, item, i)))
        })
    }

    /// Group values by key; each key's values keep encounter order
    pub fn group<K: Eq + Hash, V>(
        &self,
        mut f: impl FnMut(T) -> (K, V),
    ) -> Result<HashMap<K, Vec<V>>> {
        self.group_by("group", Vec::new, |item, _| f(item))
    }

    /// Group with the element's position available to the key function
    pub fn group_indexed<K: Eq + Hash, V>(
        &self,
        f: impl FnMut(T, usize) -> (K, V),
    ) -> Result<HashMap<K, Vec<V>>> {
        self.group_by("group_indexed", Vec::new, f)
    }

    /// Like [`Stream::group`], but every key's list starts with `V::default()`
    /// ahead of the first real value. Kept for callers that rely on that layout.
    pub fn group_seeded<K: Eq + Hash, V: Default>(
        &self,
        mut f: impl FnMut(T) -> (K, V),
    ) -> Result<HashMap<K, Vec<V>>> {
        self.group_by("group_seeded", || vec![V::default()], |item, _| f(item))
    }

    /// Seeded grouping with positions
    pub fn group_seeded_indexed<K: Eq + Hash, V: Default>(
        &self,
        f: impl FnMut(T, usize) -> (K, V),
    ) -> Result<HashMap<K, Vec<V>>> {
        self.group_by("group_seeded_indexed", || vec![V::default()], f)
    }

    /// Position of the first element for which `pred` holds
    fn position(
        &self,
        operation: &'static str,
        mut pred: impl FnMut(&T, usize) -> bool,
    ) -> Result<Option<usize>> {
        let items = self.evaluate(operation)?;
        guarded(operation, || {
            Ok(items
                .iter()
                .enumerate()
                .position(|(i, item)| pred(item, i)))
        })
    }

    fn group_by<K: Eq + Hash, V>(
        &self,
        operation: &'static str,
        seed: impl Fn() -> Vec<V>,
        mut f: impl FnMut(T, usize) -> (K, V),
    ) -> Result<HashMap<K, Vec<V>>> {
        let items = self.evaluate(operation)?;
        guarded(operation, || {
            let mut groups: HashMap<K, Vec<V>> = HashMap::new();
            for (i, item) in items.into_iter().enumerate() {
                let (key, value) = f(item, i);
                groups.entry(key).or_insert_with(&seed).push(value);
            }
            Ok(groups)
        })
    }
}

/// Linear scan keeping a candidate, replaced whenever `replace(candidate, item)`
fn scan_best<T>(items: Vec<T>, replace: impl Fn(&T, &T) -> bool) -> Option<T> {
    let mut iter = items.into_iter();
    let mut best = iter.next()?;
    for item in iter {
        if replace(&best, &item) {
            best = item;
        }
    }
    Some(best)
}
