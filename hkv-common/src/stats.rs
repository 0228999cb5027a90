//! # Performance Statistics
//!
//! Per-shard counters exposed by the `stats` command and aggregated by
//! the coordinator across every shard. Field names match the wire
//! format exactly (see the `stats` command in the wire protocol).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monotone counters owned by a single cache engine.
///
/// Durations accumulate in seconds as `f64`, mirroring the original
/// `time.time()`-based bookkeeping this design was ported from.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub read_requests: u64,
    pub write_requests: u64,
    pub cache_read_time: f64,
    pub disk_read_time: f64,
}

impl Stats {
    pub fn record_read_request(&mut self) {
        self.read_requests += 1;
    }

    pub fn record_write_request(&mut self) {
        self.write_requests += 1;
    }

    pub fn record_hit(&mut self) {
        self.hit_count += 1;
    }

    pub fn record_miss(&mut self) {
        self.miss_count += 1;
    }

    pub fn record_cache_read_time(&mut self, elapsed: Duration) {
        self.cache_read_time += elapsed.as_secs_f64();
    }

    pub fn record_disk_read_time(&mut self, elapsed: Duration) {
        self.disk_read_time += elapsed.as_secs_f64();
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    /// Point-in-time snapshot in the shape sent over the wire.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hit_rate: self.hit_rate(),
            read_requests: self.read_requests,
            write_requests: self.write_requests,
            cache_read_time: self.cache_read_time,
            disk_read_time: self.disk_read_time,
        }
    }
}

/// Serializable snapshot sent in `stats` responses and aggregated by
/// the coordinator. Deliberately excludes `hit_count`/`miss_count` —
/// only `hit_rate` crosses the wire, matching the upstream format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hit_rate: f64,
    pub read_requests: u64,
    pub write_requests: u64,
    pub cache_read_time: f64,
    pub disk_read_time: f64,
}

/// Reduces per-shard snapshots into one cluster-wide snapshot: sums
/// everything except `hit_rate`, which is the arithmetic mean.
pub fn aggregate(snapshots: &[StatsSnapshot]) -> StatsSnapshot {
    if snapshots.is_empty() {
        return StatsSnapshot {
            hit_rate: 0.0,
            read_requests: 0,
            write_requests: 0,
            cache_read_time: 0.0,
            disk_read_time: 0.0,
        };
    }

    let mut total = StatsSnapshot {
        hit_rate: 0.0,
        read_requests: 0,
        write_requests: 0,
        cache_read_time: 0.0,
        disk_read_time: 0.0,
    };

    for snapshot in snapshots {
        total.hit_rate += snapshot.hit_rate;
        total.read_requests += snapshot.read_requests;
        total.write_requests += snapshot.write_requests;
        total.cache_read_time += snapshot.cache_read_time;
        total.disk_read_time += snapshot.disk_read_time;
    }

    total.hit_rate /= snapshots.len() as f64;
    total
}
