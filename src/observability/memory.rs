//! Memory telemetry pulse.
//!
//! # Responsibilities
//! - Snapshot allocator and process memory statistics
//! - Emit one debug event per pulse on a fixed interval
//!
//! # Design Decisions
//! - Runs on its own task; shares only the log sink and metrics recorder
//! - Purely observational, never consulted for admission or scheduling

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::{alloc, metrics};

/// Interval between two telemetry pulses.
pub const MEMORY_PULSE_INTERVAL: Duration = Duration::from_secs(60);

/// Memory statistics captured by one pulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Bytes currently allocated.
    pub alloc: u64,
    /// Bytes currently allocated on the heap; same source as `alloc`.
    pub heap_alloc: u64,
    /// Cumulative bytes allocated.
    pub total_alloc: u64,
    /// Virtual memory obtained from the system.
    pub sys_alloc: u64,
    /// Resident set size.
    pub resident: u64,
    /// Deallocations performed. There is no collector to count cycles of.
    pub gc_count: u64,
}

impl MemorySnapshot {
    pub fn capture() -> Self {
        let counters = alloc::counters();
        let (sys_alloc, resident) = memory_stats::memory_stats()
            .map(|usage| (usage.virtual_mem as u64, usage.physical_mem as u64))
            .unwrap_or_default();

        Self {
            alloc: counters.live,
            heap_alloc: counters.live,
            total_alloc: counters.total,
            sys_alloc,
            resident,
            gc_count: counters.frees,
        }
    }

    fn emit(&self) {
        tracing::debug!(
            alloc = self.alloc,
            heap_alloc = self.heap_alloc,
            total_alloc = self.total_alloc,
            sys_alloc = self.sys_alloc,
            resident = self.resident,
            gc_count = self.gc_count,
            "tick"
        );
        metrics::record_memory(self);
    }
}

/// Periodic memory logger.
pub struct MemoryTelemetry {
    period: Duration,
}

impl MemoryTelemetry {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Take and emit one snapshot.
    pub fn pulse(&self) -> MemorySnapshot {
        let snapshot = MemorySnapshot::capture();
        snapshot.emit();
        snapshot
    }

    /// Pulse immediately, then once per period, until shutdown fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(period = ?self.period, "Memory telemetry starting");

        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.pulse();
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Memory telemetry received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl Default for MemoryTelemetry {
    fn default() -> Self {
        Self::new(MEMORY_PULSE_INTERVAL)
    }
}
