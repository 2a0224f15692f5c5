use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Group name the rate fields are exported under for telemetry
pub const STATS_GROUP: &str = "crtp";

/// One throughput sample, in packets per second per direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateSample {
    pub rx_rate: u16,
    pub tx_rate: u16,
}

/// Rolling link throughput counters
///
/// The pumps bump one counter per moved packet; every sampling interval the
/// counts are converted to packets-per-second rates and reset. Rates hold
/// their previous value between samples, which is fine for telemetry
/// display and too stale for anything else.
///
/// Everything is atomics: the counters are bumped concurrently from both
/// pumps, and a compare-exchange on the sample deadline makes exactly one
/// of them perform each sample.
pub struct LinkStats {
    epoch: Instant,
    interval_ms: u64,
    rx_count: AtomicU32,
    tx_count: AtomicU32,
    rx_rate: AtomicU16,
    tx_rate: AtomicU16,
    next_sample_ms: AtomicU64,
    previous_sample_ms: AtomicU64,
}

impl LinkStats {
    pub fn new(interval: Duration) -> Self {
        let interval_ms = (interval.as_millis() as u64).max(1);
        LinkStats {
            epoch: Instant::now(),
            interval_ms,
            rx_count: AtomicU32::new(0),
            tx_count: AtomicU32::new(0),
            rx_rate: AtomicU16::new(0),
            tx_rate: AtomicU16::new(0),
            // First sample after one full interval
            next_sample_ms: AtomicU64::new(interval_ms),
            previous_sample_ms: AtomicU64::new(0),
        }
    }

    /// Records one inbound packet and runs the sampling check
    pub fn record_rx(&self) {
        self.rx_count.fetch_add(1, Ordering::Relaxed);
        self.update_at(self.now_ms());
    }

    /// Records one outbound packet and runs the sampling check
    pub fn record_tx(&self) {
        self.tx_count.fetch_add(1, Ordering::Relaxed);
        self.update_at(self.now_ms());
    }

    /// Inbound rate from the most recent sample, packets per second
    pub fn rx_rate(&self) -> u16 {
        self.rx_rate.load(Ordering::Acquire)
    }

    /// Outbound rate from the most recent sample, packets per second
    pub fn tx_rate(&self) -> u16 {
        self.tx_rate.load(Ordering::Acquire)
    }

    /// Snapshot of both rates for telemetry export
    pub fn rates(&self) -> RateSample {
        RateSample {
            rx_rate: self.rx_rate(),
            tx_rate: self.tx_rate(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn update_at(&self, now_ms: u64) {
        let next = self.next_sample_ms.load(Ordering::Acquire);
        if now_ms <= next {
            return;
        }
        // Claim the sample; the loser keeps counting
        if self
            .next_sample_ms
            .compare_exchange(
                next,
                now_ms + self.interval_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let previous = self.previous_sample_ms.swap(now_ms, Ordering::AcqRel);
        let elapsed_ms = now_ms.saturating_sub(previous).max(1);
        let rx = self.rx_count.swap(0, Ordering::AcqRel) as u64;
        let tx = self.tx_count.swap(0, Ordering::AcqRel) as u64;
        self.rx_rate
            .store((rx * 1000 / elapsed_ms) as u16, Ordering::Release);
        self.tx_rate
            .store((tx * 1000 / elapsed_ms) as u16, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> LinkStats {
        LinkStats::new(Duration::from_millis(500))
    }

    #[test]
    fn test_no_sample_before_deadline() {
        let stats = stats();
        for _ in 0..10 {
            stats.rx_count.fetch_add(1, Ordering::Relaxed);
        }
        stats.update_at(400);
        assert_eq!(stats.rx_rate(), 0, "rates stay stale until the deadline");
    }

    #[test]
    fn test_exact_rates_at_sample() {
        let stats = stats();
        for _ in 0..300 {
            stats.rx_count.fetch_add(1, Ordering::Relaxed);
        }
        for _ in 0..150 {
            stats.tx_count.fetch_add(1, Ordering::Relaxed);
        }

        // 300 packets over 600 ms -> 500 packets/s, 150 -> 250 packets/s
        stats.update_at(600);
        assert_eq!(stats.rx_rate(), 500);
        assert_eq!(stats.tx_rate(), 250);
    }

    #[test]
    fn test_counters_reset_after_sample() {
        let stats = stats();
        for _ in 0..100 {
            stats.tx_count.fetch_add(1, Ordering::Relaxed);
        }
        stats.update_at(600);
        assert_eq!(stats.tx_rate(), (100u32 * 1000 / 600) as u16);

        // No traffic in the next window: the counters were zeroed, so the
        // next sample reads an exact zero rate.
        stats.update_at(1200);
        assert_eq!(stats.tx_rate(), 0);
        assert_eq!(stats.rx_rate(), 0);
    }

    #[test]
    fn test_rates_hold_between_samples() {
        let stats = stats();
        stats.rx_count.fetch_add(60, Ordering::Relaxed);
        stats.update_at(600);
        let sampled = stats.rx_rate();
        assert_eq!(sampled, 100);

        // Mid-window reads keep returning the previous sample
        stats.update_at(800);
        assert_eq!(stats.rx_rate(), sampled);
    }

    #[test]
    fn test_record_paths_count() {
        let stats = stats();
        stats.record_rx();
        stats.record_tx();
        assert_eq!(stats.rx_count.load(Ordering::Relaxed), 1);
        assert_eq!(stats.tx_count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_rate_snapshot_serializes() {
        let stats = stats();
        stats.tx_count.fetch_add(500, Ordering::Relaxed);
        stats.update_at(1000);

        let sample = stats.rates();
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"rx_rate":0,"tx_rate":500}"#);
        assert_eq!(STATS_GROUP, "crtp");
    }
}
