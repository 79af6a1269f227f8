// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use crate::device::Resource;

struct CacheEntry<R> {
    value: R,
    last_used: u64,
    inserted: u64,
}

/// Device resources keyed by content, evicted after `max_age` frames without use.
pub struct ResourceCache<K, R: Resource> {
    entries: HashMap<K, CacheEntry<R>>,
    generation: u64,
    max_age: u64,
}

impl<K: Eq + Hash + Clone, R: Resource> ResourceCache<K, R> {
    pub fn new(max_age: u64) -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
            max_age,
        }
    }

    /// Looks up `key`, marking it as used in the current frame.
    pub fn get(&mut self, key: &K) -> Option<&R> {
        let generation = self.generation;
        self.entries.get_mut(key).map(|e| {
            e.last_used = generation;
            &e.value
        })
    }

    /// Looks up `key`, creating the value with `f` when missing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        f: impl FnOnce() -> Result<R, E>,
    ) -> Result<&R, E> {
        let generation = self.generation;
        let entry = match self.entries.entry(key) {
            Entry::Occupied(o) => {
                let e = o.into_mut();
                e.last_used = generation;
                e
            }
            Entry::Vacant(v) => v.insert(CacheEntry {
                value: f()?,
                last_used: generation,
                inserted: generation,
            }),
        };
        Ok(&entry.value)
    }

    /// Inserts or replaces the value for `key`, releasing a replaced value.
    ///
    /// # Panics
    ///
    /// If `key` was already put in the current frame.
    pub fn put(&mut self, key: K, value: R) {
        let generation = self.generation;
        let new = CacheEntry {
            value,
            last_used: generation,
            inserted: generation,
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut o) => {
                if o.get().inserted == generation {
                    panic!("cache key collision");
                }
                let old = o.insert(new);
                old.value.release();
            }
            Entry::Vacant(v) => {
                v.insert(new);
            }
        }
    }

    /// Ends a frame: releases the entries not used for `max_age` frames.
    pub fn frame(&mut self) {
        let generation = self.generation;
        let max_age = self.max_age;
        let stale: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, e)| generation - e.last_used >= max_age)
            .map(|(k, _)| k.clone())
            .collect();
        if !stale.is_empty() {
            log::debug!("evicting {} cached resources", stale.len());
        }
        for key in stale {
            if let Some(e) = self.entries.remove(&key) {
                e.value.release();
            }
        }
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, R: Resource> Drop for ResourceCache<K, R> {
    fn drop(&mut self) {
        for (_, e) in self.entries.drain() {
            e.value.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Tracked(u32, Rc<RefCell<Vec<u32>>>);

    impl Resource for Tracked {
        fn release(self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    fn cache(max_age: u64) -> (ResourceCache<&'static str, Tracked>, Rc<RefCell<Vec<u32>>>) {
        (ResourceCache::new(max_age), Rc::new(RefCell::new(Vec::new())))
    }

    #[test]
    fn eviction() {
        let (mut cache, released) = cache(1);
        cache.put("a", Tracked(1, released.clone()));
        cache.put("b", Tracked(2, released.clone()));
        cache.frame();
        assert!(cache.get(&"a").is_some());
        cache.frame();
        // "b" went a whole frame without use.
        assert_eq!(*released.borrow(), vec![2]);
        assert_eq!(cache.len(), 1);
        cache.frame();
        assert_eq!(*released.borrow(), vec![2, 1]);
        assert!(cache.is_empty());
    }

    #[test]
    fn longer_max_age() {
        let (mut cache, released) = cache(3);
        cache.put("a", Tracked(1, released.clone()));
        cache.frame();
        cache.frame();
        cache.frame();
        assert!(released.borrow().is_empty());
        cache.frame();
        assert_eq!(*released.borrow(), vec![1]);
    }

    #[test]
    fn replace_releases_old() {
        let (mut cache, released) = cache(2);
        cache.put("a", Tracked(1, released.clone()));
        cache.frame();
        cache.put("a", Tracked(2, released.clone()));
        assert_eq!(*released.borrow(), vec![1]);
        assert_eq!(cache.get(&"a").map(|t| t.0), Some(2));
    }

    #[test]
    #[should_panic(expected = "cache key collision")]
    fn collision() {
        let (mut cache, released) = cache(2);
        cache.put("a", Tracked(1, released.clone()));
        cache.put("a", Tracked(2, released));
    }

    #[test]
    fn insert_with() {
        let (mut cache, released) = cache(1);
        let mut calls = 0;
        for _ in 0..2 {
            let v = cache
                .get_or_try_insert_with("a", || {
                    calls += 1;
                    Ok::<_, ()>(Tracked(7, released.clone()))
                })
                .map(|t| t.0);
            assert_eq!(v, Ok(7));
            cache.frame();
        }
        assert_eq!(calls, 1);
        let err = cache.get_or_try_insert_with("b", || Err("failed"));
        assert!(err.is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn drop_releases_everything() {
        let (mut cache, released) = cache(4);
        cache.put("a", Tracked(1, released.clone()));
        cache.put("b", Tracked(2, released.clone()));
        drop(cache);
        let mut r = released.borrow().clone();
        r.sort_unstable();
        assert_eq!(r, vec![1, 2]);
    }
}
