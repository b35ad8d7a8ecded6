//! Flow counters.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Process-wide flow counters. Recorded once per flow, not per retrigger:
/// a join link that promotes an existing flow does not count again.
#[derive(Debug, Default)]
pub struct CollaborationMetrics {
    join_flows_started: AtomicU64,
    flows_finished: AtomicU64,
}

impl CollaborationMetrics {
    pub fn record_join_flow_started(&self) {
        let total = self.join_flows_started.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(total, "join flow started");
    }

    pub fn record_flow_finished(&self) {
        self.flows_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn join_flows_started(&self) -> u64 {
        self.join_flows_started.load(Ordering::Relaxed)
    }

    pub fn flows_finished(&self) -> u64 {
        self.flows_finished.load(Ordering::Relaxed)
    }
}
