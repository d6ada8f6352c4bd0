use std::sync::atomic::{AtomicU64, Ordering};

const VERSION: u8 = 1;
const NUM_COUNTERS: usize = 19;
const RECORD_LEN: usize = 1 + 8 + NUM_COUNTERS * 8;

/// Flat record of counters, checkpointed to the code DB so a restart resumes with the
/// same statistics. Monotonic fields are atomics so concurrent `HandleResponse` calls
/// never lose a count (see the concurrency contract).
#[derive(Debug)]
pub struct DetailedProgress {
    pub requested: AtomicU64,
    pub consumed: AtomicU64,
    pub saved: AtomicU64,
    pub saved_accounts: AtomicU64,
    pub saved_state: AtomicU64,
    pub saved_storage: AtomicU64,
    pub saved_code: AtomicU64,
    pub db_checks: AtomicU64,
    pub cache_hits: AtomicU64,
    pub state_was_there: AtomicU64,
    pub state_was_not_there: AtomicU64,
    pub emptish_count: AtomicU64,
    pub bad_quality_count: AtomicU64,
    pub invalid_format_count: AtomicU64,
    pub not_assigned_count: AtomicU64,
    pub ok_count: AtomicU64,
    pub seconds_in_sync: AtomicU64,
    pub data_size: AtomicU64,
    pub last_report_time: AtomicU64,
}

impl Default for DetailedProgress {
    fn default() -> Self {
        Self::from_snapshot([0; NUM_COUNTERS])
    }
}

impl DetailedProgress {
    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_requested(&self, n: u64) {
        Self::add(&self.requested, n)
    }
    pub fn add_consumed(&self, n: u64) {
        Self::add(&self.consumed, n)
    }
    pub fn add_saved(&self, n: u64) {
        Self::add(&self.saved, n)
    }
    pub fn add_saved_accounts(&self, n: u64) {
        Self::add(&self.saved_accounts, n)
    }
    pub fn add_saved_state(&self, n: u64) {
        Self::add(&self.saved_state, n)
    }
    pub fn add_saved_storage(&self, n: u64) {
        Self::add(&self.saved_storage, n)
    }
    pub fn add_saved_code(&self, n: u64) {
        Self::add(&self.saved_code, n)
    }
    pub fn add_db_checks(&self, n: u64) {
        Self::add(&self.db_checks, n)
    }
    pub fn add_cache_hits(&self, n: u64) {
        Self::add(&self.cache_hits, n)
    }
    pub fn add_state_was_there(&self, n: u64) {
        Self::add(&self.state_was_there, n)
    }
    pub fn add_state_was_not_there(&self, n: u64) {
        Self::add(&self.state_was_not_there, n)
    }
    pub fn add_emptish(&self, n: u64) {
        Self::add(&self.emptish_count, n)
    }
    pub fn add_bad_quality(&self, n: u64) {
        Self::add(&self.bad_quality_count, n)
    }
    pub fn add_invalid_format(&self, n: u64) {
        Self::add(&self.invalid_format_count, n)
    }
    pub fn add_not_assigned(&self, n: u64) {
        Self::add(&self.not_assigned_count, n)
    }
    pub fn add_ok(&self, n: u64) {
        Self::add(&self.ok_count, n)
    }
    pub fn add_data_size(&self, n: u64) {
        Self::add(&self.data_size, n)
    }
    pub fn set_last_report_time(&self, t: u64) {
        self.last_report_time.store(t, Ordering::Relaxed);
    }
    pub fn set_seconds_in_sync(&self, t: u64) {
        self.seconds_in_sync.store(t, Ordering::Relaxed);
    }

    fn snapshot(&self) -> [u64; NUM_COUNTERS] {
        [
            self.requested.load(Ordering::Relaxed),
            self.consumed.load(Ordering::Relaxed),
            self.saved.load(Ordering::Relaxed),
            self.saved_accounts.load(Ordering::Relaxed),
            self.saved_state.load(Ordering::Relaxed),
            self.saved_storage.load(Ordering::Relaxed),
            self.saved_code.load(Ordering::Relaxed),
            self.db_checks.load(Ordering::Relaxed),
            self.cache_hits.load(Ordering::Relaxed),
            self.state_was_there.load(Ordering::Relaxed),
            self.state_was_not_there.load(Ordering::Relaxed),
            self.emptish_count.load(Ordering::Relaxed),
            self.bad_quality_count.load(Ordering::Relaxed),
            self.invalid_format_count.load(Ordering::Relaxed),
            self.not_assigned_count.load(Ordering::Relaxed),
            self.ok_count.load(Ordering::Relaxed),
            self.seconds_in_sync.load(Ordering::Relaxed),
            self.data_size.load(Ordering::Relaxed),
            self.last_report_time.load(Ordering::Relaxed),
        ]
    }

    fn from_snapshot(v: [u64; NUM_COUNTERS]) -> Self {
        Self {
            requested: AtomicU64::new(v[0]),
            consumed: AtomicU64::new(v[1]),
            saved: AtomicU64::new(v[2]),
            saved_accounts: AtomicU64::new(v[3]),
            saved_state: AtomicU64::new(v[4]),
            saved_storage: AtomicU64::new(v[5]),
            saved_code: AtomicU64::new(v[6]),
            db_checks: AtomicU64::new(v[7]),
            cache_hits: AtomicU64::new(v[8]),
            state_was_there: AtomicU64::new(v[9]),
            state_was_not_there: AtomicU64::new(v[10]),
            emptish_count: AtomicU64::new(v[11]),
            bad_quality_count: AtomicU64::new(v[12]),
            invalid_format_count: AtomicU64::new(v[13]),
            not_assigned_count: AtomicU64::new(v[14]),
            ok_count: AtomicU64::new(v[15]),
            seconds_in_sync: AtomicU64::new(v[16]),
            data_size: AtomicU64::new(v[17]),
            last_report_time: AtomicU64::new(v[18]),
        }
    }

    /// Stable, versioned byte layout: version byte, chain-id (LE u64), then the counters
    /// in declaration order as LE u64s.
    pub fn to_bytes(&self, chain_id: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_LEN);
        buf.push(VERSION);
        buf.extend_from_slice(&chain_id.to_le_bytes());
        for v in self.snapshot() {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<(u64, Self)> {
        if bytes.len() != RECORD_LEN || bytes[0] != VERSION {
            return None;
        }
        let chain_id = u64::from_le_bytes(bytes[1..9].try_into().ok()?);
        let mut values = [0u64; NUM_COUNTERS];
        for (i, slot) in values.iter_mut().enumerate() {
            let start = 9 + i * 8;
            *slot = u64::from_le_bytes(bytes[start..start + 8].try_into().ok()?);
        }
        Some((chain_id, Self::from_snapshot(values)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_is_byte_equal() {
        let progress = DetailedProgress::default();
        progress.add_requested(384);
        progress.add_saved(12);
        progress.add_saved_accounts(3);
        progress.set_last_report_time(1_700_000_000);
        let encoded = progress.to_bytes(1);
        let (chain_id, decoded) = DetailedProgress::from_bytes(&encoded).unwrap();
        assert_eq!(chain_id, 1);
        assert_eq!(decoded.to_bytes(1), encoded);
    }

    #[test]
    fn rejects_wrong_length_or_version() {
        assert!(DetailedProgress::from_bytes(&[1, 2, 3]).is_none());
        let mut encoded = DetailedProgress::default().to_bytes(1);
        encoded[0] = VERSION + 1;
        assert!(DetailedProgress::from_bytes(&encoded).is_none());
    }
}
