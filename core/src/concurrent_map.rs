//! Sharded map used to merge partial relevance scores from many workers.
//!
//! Keys are assigned to one of a fixed number of buckets by `key mod
//! bucket_count`. Every bucket has its own lock, so writers that land in
//! different buckets never contend. A caller only ever holds one bucket
//! lock at a time: `access` hands out a guard for a single value and
//! `snapshot` walks the buckets one after another.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::collections::BTreeMap;

/// Default number of buckets used by the ranking engine.
pub const DEFAULT_BUCKET_COUNT: usize = 50;

/// Integer keys that can be spread over buckets.
pub trait BucketKey: Copy + Ord {
    fn bucket(self, bucket_count: usize) -> usize;
}

macro_rules! impl_bucket_key {
    ($($t:ty),*) => {
        $(
            impl BucketKey for $t {
                #[inline]
                fn bucket(self, bucket_count: usize) -> usize {
                    (self as i128).rem_euclid(bucket_count as i128) as usize
                }
            }
        )*
    };
}

impl_bucket_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

pub struct ConcurrentMap<K, V> {
    buckets: Vec<Mutex<BTreeMap<K, V>>>,
}

impl<K: BucketKey, V> ConcurrentMap<K, V> {
    /// A zero bucket count is treated as one.
    pub fn new(bucket_count: usize) -> Self {
        let buckets = (0..bucket_count.max(1))
            .map(|_| Mutex::new(BTreeMap::new()))
            .collect();
        Self { buckets }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn bucket_for(&self, key: K) -> &Mutex<BTreeMap<K, V>> {
        &self.buckets[key.bucket(self.buckets.len())]
    }

    /// Exclusive handle to the value for `key`, inserting `V::default()` if
    /// absent. The bucket stays locked until the handle is dropped.
    pub fn access(&self, key: K) -> MappedMutexGuard<'_, V>
    where
        V: Default,
    {
        let guard = self.bucket_for(key).lock();
        MutexGuard::map(guard, |bucket| bucket.entry(key).or_default())
    }

    /// Remove `key` if present.
    pub fn erase(&self, key: K) {
        self.bucket_for(key).lock().remove(&key);
    }

    /// Merge all buckets into one ordered map.
    pub fn snapshot(&self) -> BTreeMap<K, V>
    where
        V: Clone,
    {
        let mut merged = BTreeMap::new();
        for bucket in &self.buckets {
            let guard = bucket.lock();
            merged.extend(guard.iter().map(|(k, v)| (*k, v.clone())));
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.lock().is_empty())
    }
}

impl<K: BucketKey, V> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_COUNT)
    }
}

impl<K, V> std::fmt::Debug for ConcurrentMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("bucket_count", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn access_inserts_default() {
        let map: ConcurrentMap<i32, f64> = ConcurrentMap::new(4);
        assert!(map.is_empty());
        *map.access(7) += 1.5;
        *map.access(7) += 1.0;
        assert_eq!(map.len(), 1);
        assert_eq!(map.snapshot().get(&7), Some(&2.5));
    }

    #[test]
    fn erase_missing_key_is_noop() {
        let map: ConcurrentMap<i32, f64> = ConcurrentMap::new(3);
        map.erase(11);
        *map.access(2) += 1.0;
        map.erase(2);
        assert!(map.snapshot().is_empty());
    }

    #[test]
    fn negative_keys_map_to_valid_buckets() {
        assert_eq!((-1i32).bucket(50), 49);
        assert_eq!(0i32.bucket(50), 0);
        assert_eq!(123u64.bucket(50), 23);
        let map: ConcurrentMap<i32, u32> = ConcurrentMap::new(50);
        *map.access(-1) += 1;
        assert_eq!(map.snapshot().get(&-1), Some(&1));
    }

    #[test]
    fn zero_buckets_treated_as_one() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::new(0);
        assert_eq!(map.bucket_count(), 1);
        *map.access(5) += 1;
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn snapshot_is_ordered() {
        let map: ConcurrentMap<i32, i32> = ConcurrentMap::new(7);
        for key in [42, 3, 17, 8, 0] {
            *map.access(key) = key * 2;
        }
        let keys: Vec<_> = map.snapshot().into_keys().collect();
        assert_eq!(keys, vec![0, 3, 8, 17, 42]);
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let map = Arc::new(ConcurrentMap::<u32, u64>::new(5));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for key in 0..100u32 {
                        *map.access(key) += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snapshot = map.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert!(snapshot.values().all(|&v| v == 8));
    }

    #[test]
    fn rayon_writers_match_sequential_sum() {
        let map: ConcurrentMap<i32, i64> = ConcurrentMap::new(50);
        (0..10_000i64).into_par_iter().for_each(|i| {
            *map.access((i % 97) as i32) += i;
        });
        let total: i64 = map.snapshot().values().sum();
        assert_eq!(total, (0..10_000i64).sum());
    }
}
