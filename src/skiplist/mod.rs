//! Ordered index used for object name lookups and the event queue
//!
//! Implements a skiplist-backed ordered multi-map:
//! - Keyed inserts with duplicate policies (reject, append before/after equals)
//! - Ordered traversal and equal-key run scans
//! - Priority-queue style `peek_min`/`pop_min`
//! - Identity-based removal among duplicate keys
//!
//! Nodes live in an internal arena and link to each other by slot index, so
//! the structure owns its memory outright and removal never invalidates
//! unrelated entries.

use std::cmp::Ordering;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// How `insert` treats a key that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Reject the insert and leave the list unchanged.
    Unique,
    /// Keep the new entry, placed before existing entries with an equal key.
    DupesBefore,
    /// Keep the new entry, placed after existing entries with an equal key.
    DupesAfter,
}

type Link = Option<usize>;

struct Node<K, V> {
    key: K,
    value: V,
    /// Forward links, one per level this node participates in.
    forward: Vec<Link>,
}

/// Skiplist-backed ordered multi-map.
///
/// Expected O(log n) insert and find, O(1) pop of the minimum entry. The
/// level of each inserted node is chosen by weighted coin flips from an
/// internal RNG; use [`SkipList::with_seed`] when a reproducible shape
/// matters (shape only; logical ordering never depends on the RNG).
pub struct SkipList<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    /// Header forward links; grows as the occupied level count grows.
    head: Vec<Link>,
    len: usize,
    max_levels: usize,
    probability: f32,
    policy: DuplicatePolicy,
    rng: SmallRng,
}

impl<K: Ord, V> SkipList<K, V> {
    /// Create an empty list with entropy-seeded leveling.
    pub fn new(max_levels: usize, probability: f32, policy: DuplicatePolicy) -> Self {
        Self::with_rng(max_levels, probability, policy, SmallRng::from_entropy())
    }

    /// Create an empty list with a fixed RNG seed (deterministic shape).
    pub fn with_seed(
        max_levels: usize,
        probability: f32,
        policy: DuplicatePolicy,
        seed: u64,
    ) -> Self {
        Self::with_rng(max_levels, probability, policy, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(max_levels: usize, probability: f32, policy: DuplicatePolicy, rng: SmallRng) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: Vec::new(),
            len: 0,
            max_levels: max_levels.max(1),
            probability,
            policy,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, id: usize) -> &Node<K, V> {
        self.nodes[id].as_ref().unwrap()
    }

    fn node_mut(&mut self, id: usize) -> &mut Node<K, V> {
        self.nodes[id].as_mut().unwrap()
    }

    /// Forward link at `level` from `from` (`None` meaning the header).
    fn next_at(&self, from: Link, level: usize) -> Link {
        match from {
            Some(id) => self.node(id).forward.get(level).copied().flatten(),
            None => self.head.get(level).copied().flatten(),
        }
    }

    fn set_next(&mut self, from: Link, level: usize, to: Link) {
        match from {
            Some(id) => self.node_mut(id).forward[level] = to,
            None => self.head[level] = to,
        }
    }

    /// Weighted coin flips, capped at the configured maximum.
    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level + 1 < self.max_levels && self.rng.gen::<f32>() < self.probability {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) -> Node<K, V> {
        let node = self.nodes[id].take().unwrap();
        self.free.push(id);
        node
    }

    /// Drop empty header levels after a removal.
    fn shrink_head(&mut self) {
        while matches!(self.head.last(), Some(None)) {
            self.head.pop();
        }
    }

    /// Walk down the levels collecting, per level, the last link whose
    /// successor does not satisfy `stop`.
    fn build_update<F>(&self, stop: F) -> Vec<Link>
    where
        F: Fn(&Node<K, V>) -> bool,
    {
        let mut update: Vec<Link> = vec![None; self.head.len()];
        let mut cur: Link = None;
        for level in (0..self.head.len()).rev() {
            while let Some(next) = self.next_at(cur, level) {
                if stop(self.node(next)) {
                    break;
                }
                cur = Some(next);
            }
            update[level] = cur;
        }
        update
    }

    /// Insert an entry. Returns `false` (list unchanged) when the policy is
    /// [`DuplicatePolicy::Unique`] and an equal key is already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.policy == DuplicatePolicy::Unique && self.find_first(&key).is_some() {
            return false;
        }

        let after_equals = self.policy == DuplicatePolicy::DupesAfter;
        let update = self.build_update(|node| match node.key.cmp(&key) {
            Ordering::Less => false,
            Ordering::Equal => !after_equals,
            Ordering::Greater => true,
        });

        let node_level = self.random_level();
        while self.head.len() <= node_level {
            self.head.push(None);
        }

        let id = self.alloc(Node {
            key,
            value,
            forward: vec![None; node_level + 1],
        });
        for level in 0..=node_level {
            let prev = update.get(level).copied().flatten();
            let next = self.next_at(prev, level);
            self.node_mut(id).forward[level] = next;
            self.set_next(prev, level, Some(id));
        }

        self.len += 1;
        true
    }

    /// First node whose key is not less than `key`, or `None`.
    fn lower_bound(&self, key: &K) -> Link {
        let update = self.build_update(|node| node.key.cmp(key) != Ordering::Less);
        self.next_at(update.first().copied().flatten(), 0)
    }

    /// First value stored under `key`.
    pub fn find_first(&self, key: &K) -> Option<&V> {
        let id = self.lower_bound(key)?;
        let node = self.node(id);
        (node.key == *key).then_some(&node.value)
    }

    /// All values stored under `key`, in insertion-policy order.
    pub fn find_all<'a>(&'a self, key: &'a K) -> impl Iterator<Item = &'a V> {
        let mut cursor = self.lower_bound(key);
        std::iter::from_fn(move || {
            let id = cursor?;
            let node = self.node(id);
            if node.key != *key {
                return None;
            }
            cursor = node.forward[0];
            Some(&node.value)
        })
    }

    /// Smallest entry without removing it.
    pub fn peek_min(&self) -> Option<(&K, &V)> {
        let id = self.next_at(None, 0)?;
        let node = self.node(id);
        Some((&node.key, &node.value))
    }

    /// Remove and return the smallest entry.
    pub fn pop_min(&mut self) -> Option<(K, V)> {
        let id = self.next_at(None, 0)?;
        for level in 0..self.node(id).forward.len() {
            if self.head[level] == Some(id) {
                self.head[level] = self.node(id).forward[level];
            }
        }
        self.shrink_head();
        self.len -= 1;
        let node = self.release(id);
        Some((node.key, node.value))
    }

    /// Remove the first entry matching both key and value. Removes at most
    /// one node even when duplicate keys are present.
    pub fn remove_entry(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        // Advance through equal keys until the exact entry is the successor.
        let update = self.build_update(|node| match node.key.cmp(key) {
            Ordering::Less => false,
            Ordering::Equal => node.value == *value,
            Ordering::Greater => true,
        });

        let target = match self.next_at(update.first().copied().flatten(), 0) {
            Some(id) => id,
            None => return false,
        };
        {
            let node = self.node(target);
            if node.key != *key || node.value != *value {
                return false;
            }
        }

        for level in 0..self.node(target).forward.len() {
            let prev = update.get(level).copied().flatten();
            if self.next_at(prev, level) == Some(target) {
                let next = self.node(target).forward[level];
                self.set_next(prev, level, next);
            }
        }
        self.shrink_head();
        self.len -= 1;
        self.release(target);
        true
    }

    /// Drop every entry but keep the allocated structure for reuse.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head.clear();
        self.len = 0;
    }

    /// Ordered traversal over `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head.first().copied().flatten(),
        }
    }
}

/// Ordered cursor over a [`SkipList`].
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    cursor: Link,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.node(id);
        self.cursor = node.forward[0];
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(policy: DuplicatePolicy, items: &[(&str, u32)]) -> SkipList<String, u32> {
        let mut list = SkipList::with_seed(16, 0.5, policy, 42);
        for (k, v) in items {
            list.insert(k.to_string(), *v);
        }
        list
    }

    #[test]
    fn test_ordered_traversal_is_sorted() {
        let list = filled(
            DuplicatePolicy::Unique,
            &[("web01", 1), ("db01", 2), ("mail", 3), ("app02", 4), ("app01", 5)],
        );
        let keys: Vec<&str> = list.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["app01", "app02", "db01", "mail", "web01"]);
    }

    #[test]
    fn test_unique_policy_rejects_duplicates() {
        let mut list = filled(DuplicatePolicy::Unique, &[("web01", 1)]);
        assert!(!list.insert("web01".to_string(), 2));
        assert_eq!(list.len(), 1);
        assert_eq!(list.find_first(&"web01".to_string()), Some(&1));
    }

    #[test]
    fn test_duplicate_append_order() {
        let before = filled(DuplicatePolicy::DupesBefore, &[("k", 1), ("k", 2), ("k", 3)]);
        let got: Vec<u32> = before.find_all(&"k".to_string()).copied().collect();
        assert_eq!(got, vec![3, 2, 1]);

        let after = filled(DuplicatePolicy::DupesAfter, &[("k", 1), ("k", 2), ("k", 3)]);
        let got: Vec<u32> = after.find_all(&"k".to_string()).copied().collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn test_pop_min_returns_current_minimum() {
        let mut list = filled(
            DuplicatePolicy::DupesAfter,
            &[("c", 1), ("a", 2), ("b", 3), ("a", 4)],
        );
        assert_eq!(list.peek_min().map(|(k, _)| k.as_str()), Some("a"));
        assert_eq!(list.pop_min(), Some(("a".to_string(), 2)));
        assert_eq!(list.pop_min(), Some(("a".to_string(), 4)));
        assert_eq!(list.pop_min(), Some(("b".to_string(), 3)));
        assert_eq!(list.pop_min(), Some(("c".to_string(), 1)));
        assert_eq!(list.pop_min(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_empty_peek_and_pop() {
        let mut list: SkipList<String, u32> =
            SkipList::with_seed(16, 0.5, DuplicatePolicy::Unique, 1);
        assert!(list.peek_min().is_none());
        assert!(list.pop_min().is_none());
    }

    #[test]
    fn test_remove_entry_removes_exactly_one_among_duplicates() {
        let mut list = filled(DuplicatePolicy::DupesAfter, &[("k", 1), ("k", 2), ("k", 3)]);
        assert!(list.remove_entry(&"k".to_string(), &2));
        let got: Vec<u32> = list.find_all(&"k".to_string()).copied().collect();
        assert_eq!(got, vec![1, 3]);
        assert_eq!(list.len(), 2);

        assert!(!list.remove_entry(&"k".to_string(), &2));
        assert!(!list.remove_entry(&"missing".to_string(), &1));
    }

    #[test]
    fn test_clear_keeps_structure_usable() {
        let mut list = filled(DuplicatePolicy::Unique, &[("a", 1), ("b", 2)]);
        list.clear();
        assert!(list.is_empty());
        assert!(list.insert("c".to_string(), 3));
        assert_eq!(list.find_first(&"c".to_string()), Some(&3));
    }

    #[test]
    fn test_large_insert_stays_sorted() {
        let mut list = SkipList::with_seed(16, 0.5, DuplicatePolicy::DupesAfter, 7);
        for i in (0..500).rev() {
            list.insert(format!("host{:03}", i % 97), i);
        }
        let keys: Vec<&String> = list.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(list.len(), 500);
    }

    #[test]
    fn test_compound_keys_order_by_pair() {
        let mut list: SkipList<(String, String), u32> =
            SkipList::with_seed(16, 0.5, DuplicatePolicy::Unique, 9);
        list.insert(("web01".into(), "ssh".into()), 1);
        list.insert(("app01".into(), "http".into()), 2);
        list.insert(("app01".into(), "disk".into()), 3);
        let keys: Vec<(&str, &str)> = list
            .iter()
            .map(|(k, _)| (k.0.as_str(), k.1.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("app01", "disk"), ("app01", "http"), ("web01", "ssh")]
        );
    }
}
