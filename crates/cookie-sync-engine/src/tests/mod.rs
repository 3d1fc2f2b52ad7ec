//! Scenario tests for the cookie sync engine.
//!
//! - `harness.rs`     - fake live/local stores and a wired engine
//! - `synchronize.rs` - one cycle: writes, aborts, degraded domains
//! - `monitor_loop.rs` - live changes persisted and fed into the next cycle
//! - `concurrency.rs` - per-user serialization of cycles
//! - `persistence.rs` - file-backed snapshots across engine instances
