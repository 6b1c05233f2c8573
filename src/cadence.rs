//! Bus traffic cadence detection.
//!
//! Commands are written into the gap after inbound traffic, which works
//! because the wallpad normally polls its devices many times a second.
//! Some installations are nearly silent though, and there the queue
//! would starve waiting for a gap that never comes.
//!
//! The monitor observes the first ten seconds after the first inbound
//! record and decides once, for the life of the process, whether bus
//! events alone will drain the queue or a periodic fallback timer has to
//! take over.

use std::time::Duration;

use tokio::time::Instant;

/// Observation window, measured from the first inbound record.
pub const BOOTSTRAP_WINDOW: Duration = Duration::from_secs(10);

/// Mean inter-record gap below which the bus counts as chatty.
pub const CHATTY_MEAN_GAP: Duration = Duration::from_millis(100);

/// Drain cadence used when the bus is too quiet to piggyback on.
pub const FALLBACK_DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// One-shot verdict on the bus cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceDecision {
    /// No second record arrived inside the window. Something is wrong
    /// with the bus; commands would never go out either way.
    NoTraffic,
    /// Records arrive densely enough that every queued command finds a
    /// gap within a beat.
    Chatty,
    /// Sparse traffic. A periodic drain timer has to carry the queue.
    NeedsFallbackTimer,
}

/// Collects inter-arrival gaps during the bootstrap window.
#[derive(Debug)]
pub struct CadenceMonitor {
    decided: Option<CadenceDecision>,
    last_arrival: Option<Instant>,
    gap_sum: Duration,
    gap_count: u32,
}

impl CadenceMonitor {
    pub fn new() -> Self {
        Self {
            decided: None,
            last_arrival: None,
            gap_sum: Duration::ZERO,
            gap_count: 0,
        }
    }

    /// Record one inbound record arrival.
    ///
    /// Returns true exactly once, on the very first arrival; that is the
    /// caller's cue to start the observation window. A no-op once the
    /// decision is made.
    pub fn record_arrival(&mut self, now: Instant) -> bool {
        if self.decided.is_some() {
            return false;
        }
        match self.last_arrival.replace(now) {
            None => true,
            Some(previous) => {
                self.gap_sum += now.duration_since(previous);
                self.gap_count += 1;
                false
            }
        }
    }

    /// Close the window and fix the decision.
    pub fn decide(&mut self) -> CadenceDecision {
        if let Some(decision) = self.decided {
            return decision;
        }
        let decision = if self.gap_count == 0 {
            CadenceDecision::NoTraffic
        } else if self.gap_sum / self.gap_count >= CHATTY_MEAN_GAP {
            CadenceDecision::NeedsFallbackTimer
        } else {
            CadenceDecision::Chatty
        };
        self.decided = Some(decision);
        decision
    }

    /// The verdict, once [`decide`](Self::decide) has been called.
    pub fn decision(&self) -> Option<CadenceDecision> {
        self.decided
    }
}

impl Default for CadenceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_arrival_starts_window_once() {
        let mut monitor = CadenceMonitor::new();
        let t0 = Instant::now();

        assert!(monitor.record_arrival(t0));
        assert!(!monitor.record_arrival(t0 + Duration::from_millis(10)));
        assert!(!monitor.record_arrival(t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_dense_traffic_is_chatty() {
        let mut monitor = CadenceMonitor::new();
        let t0 = Instant::now();

        monitor.record_arrival(t0);
        for i in 1..100u64 {
            monitor.record_arrival(t0 + Duration::from_millis(i * 10));
        }

        assert_eq!(monitor.decide(), CadenceDecision::Chatty);
    }

    #[test]
    fn test_sparse_traffic_needs_fallback_timer() {
        let mut monitor = CadenceMonitor::new();
        let t0 = Instant::now();

        monitor.record_arrival(t0);
        for i in 1..10u64 {
            monitor.record_arrival(t0 + Duration::from_millis(i * 500));
        }

        assert_eq!(monitor.decide(), CadenceDecision::NeedsFallbackTimer);
    }

    #[test]
    fn test_gap_exactly_at_threshold_needs_timer() {
        let mut monitor = CadenceMonitor::new();
        let t0 = Instant::now();

        monitor.record_arrival(t0);
        monitor.record_arrival(t0 + CHATTY_MEAN_GAP);

        assert_eq!(monitor.decide(), CadenceDecision::NeedsFallbackTimer);
    }

    #[test]
    fn test_lone_record_means_no_traffic() {
        let mut monitor = CadenceMonitor::new();
        monitor.record_arrival(Instant::now());
        assert_eq!(monitor.decide(), CadenceDecision::NoTraffic);
    }

    #[test]
    fn test_decision_is_sticky() {
        let mut monitor = CadenceMonitor::new();
        let t0 = Instant::now();

        monitor.record_arrival(t0);
        monitor.record_arrival(t0 + Duration::from_millis(5));
        assert_eq!(monitor.decide(), CadenceDecision::Chatty);

        // Later sparse arrivals cannot flip the verdict
        assert!(!monitor.record_arrival(t0 + Duration::from_secs(30)));
        assert_eq!(monitor.decide(), CadenceDecision::Chatty);
        assert_eq!(monitor.decision(), Some(CadenceDecision::Chatty));
    }
}
