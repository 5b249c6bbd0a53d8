//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!     → memory.rs (periodic memory telemetry pulse)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape on /metric)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The subscriber and the metrics recorder are built once in `main`
//! - Metrics are cheap (atomic increments)

pub mod alloc;
pub mod logging;
pub mod memory;
pub mod metrics;
