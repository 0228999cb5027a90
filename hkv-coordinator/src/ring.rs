//! # Consistent Hash Ring
//!
//! 128-bit MD5 positions on a ring, `replicas` virtual nodes per
//! shard address. Lookup is a binary search for the first position at
//! or after the key's hash, wrapping to the start of the ring. Ported
//! from the `ConsistentHashing` class this design was distilled from,
//! with `bisect.bisect_right`'s linear node list replaced by a sorted
//! `Vec` searched with `partition_point`.

const DEFAULT_REPLICAS: usize = 3;

fn hash(data: &str) -> u128 {
    u128::from_be_bytes(md5::compute(data.as_bytes()).0)
}

/// Sorted set of `(ring position, shard address)` pairs.
pub struct Ring {
    replicas: usize,
    positions: Vec<(u128, String)>,
}

impl Ring {
    pub fn new(replicas: usize) -> Self {
        Ring {
            replicas,
            positions: Vec::new(),
        }
    }

    pub fn with_default_replicas() -> Self {
        Ring::new(DEFAULT_REPLICAS)
    }

    /// Inserts `replicas` virtual positions for `addr`. Duplicate
    /// positions (an MD5 collision across virtual nodes) are ignored
    /// rather than double-inserted.
    pub fn add_node(&mut self, addr: &str) {
        for i in 0..self.replicas {
            let position = hash(&format!("{addr}:{i}"));
            if let Err(idx) = self
                .positions
                .binary_search_by(|(pos, _)| pos.cmp(&position))
            {
                self.positions.insert(idx, (position, addr.to_string()));
            }
        }
    }

    /// Removes every virtual position belonging to `addr`.
    pub fn remove_node(&mut self, addr: &str) {
        self.positions.retain(|(_, a)| a != addr);
    }

    /// Returns the shard address owning `key`, or `None` if the ring
    /// is empty.
    pub fn get_node(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let target = hash(key);
        let idx = self.positions.partition_point(|(pos, _)| *pos < target);
        let idx = if idx == self.positions.len() { 0 } else { idx };
        Some(&self.positions[idx].1)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = Ring::with_default_replicas();
        assert_eq!(ring.get_node("foo"), None);
    }

    #[test]
    fn single_node_owns_every_key() {
        let mut ring = Ring::with_default_replicas();
        ring.add_node("127.0.0.1:9000");
        assert_eq!(ring.get_node("anything"), Some("127.0.0.1:9000"));
        assert_eq!(ring.get_node("else"), Some("127.0.0.1:9000"));
    }

    #[test]
    fn add_node_inserts_exactly_replicas_positions() {
        let mut ring = Ring::new(3);
        ring.add_node("127.0.0.1:9000");
        assert_eq!(ring.positions.len(), 3);
    }

    #[test]
    fn remove_node_removes_exactly_its_positions() {
        let mut ring = Ring::new(3);
        ring.add_node("127.0.0.1:9000");
        ring.add_node("127.0.0.1:9001");
        assert_eq!(ring.positions.len(), 6);
        ring.remove_node("127.0.0.1:9000");
        assert_eq!(ring.positions.len(), 3);
        assert!(ring.positions.iter().all(|(_, a)| a == "127.0.0.1:9001"));
    }

    #[test]
    fn lookup_is_deterministic_for_same_key() {
        let mut ring = Ring::with_default_replicas();
        ring.add_node("127.0.0.1:9000");
        ring.add_node("127.0.0.1:9001");
        ring.add_node("127.0.0.1:9002");
        let first = ring.get_node("stable-key");
        let second = ring.get_node("stable-key");
        assert_eq!(first, second);
    }

    #[test]
    fn positions_are_sorted_ascending() {
        let mut ring = Ring::with_default_replicas();
        ring.add_node("a");
        ring.add_node("b");
        ring.add_node("c");
        let positions: Vec<u128> = ring.positions.iter().map(|(p, _)| *p).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }
}
