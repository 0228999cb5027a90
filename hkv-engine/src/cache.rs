//! # Two-Tier Cache Engine
//!
//! A capacity-bounded LRU over a key→value mapping with O(1) access
//! and eviction, backed by a disk-spill tier for evicted entries.
//!
//! Uses a single intrusive keyed list (arena of nodes indexed by
//! `usize`, `hashbrown::HashMap<String, usize>` for lookup) under one
//! lock, rather than a hand-rolled doubly linked list of boxed nodes —
//! the same index-based arena technique used for sharded in-memory
//! caches elsewhere in this codebase, collapsed here to one shard per
//! engine since each shard node owns exactly one `CacheEngine`.

use std::path::PathBuf;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::Mutex;

use hkv_common::stats::{Stats, StatsSnapshot};

use crate::disk::DiskOverflow;

#[derive(Debug)]
struct Node {
    key: String,
    value: String,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    capacity: usize,
    index: HashMap<String, usize, RandomState>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    stats: Stats,
}

impl Inner {
    fn lru_remove(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("node exists");
            (node.prev, node.next)
        };

        match prev {
            Some(prev_idx) => self.nodes[prev_idx].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(next_idx) => self.nodes[next_idx].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }

        let node = self.nodes[idx].as_mut().unwrap();
        node.prev = None;
        node.next = None;
    }

    fn lru_push_front(&mut self, idx: usize) {
        let head = self.head;
        {
            let node = self.nodes[idx].as_mut().unwrap();
            node.prev = None;
            node.next = head;
        }
        if let Some(head_idx) = head {
            self.nodes[head_idx].as_mut().unwrap().prev = Some(idx);
        } else {
            self.tail = Some(idx);
        }
        self.head = Some(idx);
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.lru_remove(idx);
        self.lru_push_front(idx);
    }

    fn unlink_and_free(&mut self, idx: usize) -> Node {
        self.lru_remove(idx);
        let node = self.nodes[idx].take().expect("node exists");
        self.index.remove(&node.key);
        self.free.push(idx);
        node
    }

    fn insert_front(&mut self, key: String, value: String) {
        let idx = self.free.pop().unwrap_or_else(|| {
            self.nodes.push(None);
            self.nodes.len() - 1
        });
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.lru_push_front(idx);
        self.index.insert(key, idx);
    }
}

/// The cache engine for one shard: bounded LRU in memory, disk
/// overflow for evicted entries, and the shard's performance counters.
pub struct CacheEngine {
    inner: Mutex<Inner>,
    disk: DiskOverflow,
}

impl CacheEngine {
    /// Creates an engine with the given capacity, backed by `disk_path`
    /// (created if it does not already exist).
    pub fn new(capacity: usize, disk_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        assert!(capacity > 0, "cache capacity must be positive");
        Ok(CacheEngine {
            inner: Mutex::new(Inner {
                capacity,
                index: HashMap::with_hasher(RandomState::new()),
                nodes: Vec::new(),
                free: Vec::new(),
                head: None,
                tail: None,
                stats: Stats::default(),
            }),
            disk: DiskOverflow::new(disk_path)?,
        })
    }

    /// Looks up `key`. A resident hit promotes the entry to the head of
    /// the LRU order. A memory miss consults the disk tier but does
    /// not re-admit the value to memory (documented open question —
    /// preserved from the source design; see DESIGN.md).
    pub fn get(&self, key: &str) -> Option<String> {
        let start = Instant::now();
        let mut inner = self.inner.lock();
        inner.stats.record_read_request();

        if let Some(&idx) = inner.index.get(key) {
            inner.promote(idx);
            let value = inner.nodes[idx].as_ref().unwrap().value.clone();
            inner.stats.record_hit();
            inner.stats.record_cache_read_time(start.elapsed());
            return Some(value);
        }
        drop(inner);

        let disk_result = self.disk.read(key);
        let mut inner = self.inner.lock();
        match disk_result {
            Ok(Some(value)) => {
                inner.stats.record_hit();
                inner.stats.record_disk_read_time(start.elapsed());
                Some(value)
            }
            Ok(None) => {
                inner.stats.record_miss();
                inner.stats.record_disk_read_time(start.elapsed());
                None
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "disk read failed, treating as miss");
                inner.stats.record_miss();
                inner.stats.record_disk_read_time(start.elapsed());
                None
            }
        }
    }

    /// Inserts or replaces `key`. Evicts the least-recently-used entry
    /// to disk first if the cache is at capacity. Any stale disk
    /// record for `key` is purged first, so a later miss cannot
    /// resurrect a value this `put` is about to overwrite.
    pub fn put(&self, key: &str, value: &str) {
        if let Err(err) = self.disk.remove(key) {
            tracing::error!(%key, error = %err, "failed to purge stale disk record");
        }

        let mut inner = self.inner.lock();
        inner.stats.record_write_request();

        if let Some(&idx) = inner.index.get(key) {
            inner.unlink_and_free(idx);
        }

        if inner.index.len() >= inner.capacity {
            if let Some(tail_idx) = inner.tail {
                let (evicted_key, evicted_value) = {
                    let node = inner.nodes[tail_idx].as_ref().expect("tail node exists");
                    (node.key.clone(), node.value.clone())
                };
                drop(inner);
                if let Err(err) = self.disk.write(&evicted_key, &evicted_value) {
                    tracing::error!(key = %evicted_key, error = %err, "evicted entry lost, disk write failed");
                }
                inner = self.inner.lock();
                inner.unlink_and_free(tail_idx);
            }
        }

        inner.insert_front(key.to_string(), value.to_string());
    }

    /// Point-in-time snapshot of this shard's performance counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats.snapshot()
    }

    #[cfg(test)]
    fn resident_len(&self) -> usize {
        self.inner.lock().index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(capacity: usize) -> (CacheEngine, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let engine = CacheEngine::new(capacity, tmp.path()).unwrap();
        (engine, tmp)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (cache, _tmp) = engine(10);
        cache.put("foo", "bar");
        assert_eq!(cache.get("foo"), Some("bar".to_string()));
    }

    #[test]
    fn get_missing_key_is_none_and_counts_miss() {
        let (cache, _tmp) = engine(10);
        assert_eq!(cache.get("ghost"), None);
        let stats = cache.stats();
        assert_eq!(stats.read_requests, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn capacity_bound_never_exceeded() {
        let (cache, _tmp) = engine(2);
        cache.put("a", "1");
        cache.put("b", "2");
        cache.put("c", "3");
        assert_eq!(cache.resident_len(), 2);
    }

    #[test]
    fn eviction_targets_lru_tail_and_spills_to_disk() {
        let (cache, _tmp) = engine(2);
        cache.put("a", "1");
        cache.put("b", "2");
        cache.put("c", "3");
        // "a" was the tail (least recently used) and should now live on disk.
        assert_eq!(cache.get("a"), Some("1".to_string()));
        assert_eq!(cache.get("b"), Some("2".to_string()));
        assert_eq!(cache.get("c"), Some("3".to_string()));
    }

    #[test]
    fn get_promotes_to_head_changing_eviction_order() {
        let (cache, _tmp) = engine(2);
        cache.put("a", "1");
        cache.put("b", "2");
        cache.get("a"); // promote "a"; "b" is now the LRU tail
        cache.put("c", "3");
        assert!(cache.get("b").is_some()); // only overflowed, still retrievable
        assert_eq!(cache.resident_len(), 2);
    }

    #[test]
    fn put_replacing_resident_key_does_not_grow_capacity() {
        let (cache, _tmp) = engine(2);
        cache.put("a", "1");
        cache.put("a", "2");
        assert_eq!(cache.resident_len(), 1);
        assert_eq!(cache.get("a"), Some("2".to_string()));
    }

    #[test]
    fn put_purges_stale_disk_copy_of_replaced_key() {
        let (cache, _tmp) = engine(1);
        cache.put("a", "1");
        cache.put("b", "2"); // evicts "a" to disk
        cache.put("a", "fresh"); // "a" resident again; stale disk copy must be purged
        cache.put("c", "3"); // evicts "a" again
        assert_eq!(cache.get("a"), Some("fresh".to_string()));
    }

    #[test]
    fn hit_rate_reaches_one_when_every_read_hits() {
        let (cache, _tmp) = engine(10);
        cache.put("a", "1");
        cache.get("a");
        cache.get("a");
        assert_eq!(cache.stats().hit_rate, 1.0);
    }
}
