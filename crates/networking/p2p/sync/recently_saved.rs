use std::collections::{BTreeMap, HashMap};

use ethereum_types::H256;

/// Bounded filter of hashes known to be already persisted, so the response handler can
/// skip a DB round-trip for work that was just written. False negatives are fine (they
/// just force a DB check); false positives are forbidden (they would drop work), so
/// eviction is strictly least-recently-used.
pub struct RecentlySavedFilter {
    capacity: usize,
    tick: u64,
    last_used: HashMap<H256, u64>,
    by_tick: BTreeMap<u64, H256>,
}

impl RecentlySavedFilter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tick: 0,
            last_used: HashMap::new(),
            by_tick: BTreeMap::new(),
        }
    }

    fn bump(&mut self, hash: H256) {
        if let Some(old_tick) = self.last_used.get(&hash) {
            self.by_tick.remove(old_tick);
        }
        self.tick += 1;
        self.by_tick.insert(self.tick, hash);
        self.last_used.insert(hash, self.tick);
    }

    /// Reports membership and refreshes recency on a hit.
    pub fn get(&mut self, hash: &H256) -> bool {
        if self.last_used.contains_key(hash) {
            self.bump(*hash);
            true
        } else {
            false
        }
    }

    /// Inserts a hash, evicting the least-recently-used entry on overflow.
    pub fn set(&mut self, hash: H256) {
        self.bump(hash);
        while self.last_used.len() > self.capacity {
            let oldest = match self.by_tick.keys().next().copied() {
                Some(t) => t,
                None => break,
            };
            if let Some(h) = self.by_tick.remove(&oldest) {
                self.last_used.remove(&h);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.last_used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_used.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hit_after_set() {
        let mut filter = RecentlySavedFilter::new(16);
        let h = H256::repeat_byte(1);
        assert!(!filter.get(&h));
        filter.set(h);
        assert!(filter.get(&h));
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut filter = RecentlySavedFilter::new(2);
        let a = H256::repeat_byte(1);
        let b = H256::repeat_byte(2);
        let c = H256::repeat_byte(3);
        filter.set(a);
        filter.set(b);
        // touch `a` so `b` becomes the least-recently-used entry
        assert!(filter.get(&a));
        filter.set(c);
        assert!(filter.get(&a));
        assert!(!filter.get(&b));
        assert!(filter.get(&c));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut filter = RecentlySavedFilter::new(4);
        for i in 0..100u8 {
            filter.set(H256::repeat_byte(i));
        }
        assert!(filter.len() <= 4);
    }
}
