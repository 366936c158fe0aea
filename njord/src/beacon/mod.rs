//! Beacon cycle, configuration refresh, and their runtime.
//!
//! # Architecture
//!
//! ```text
//! BeaconRuntime
//!     ├── BeaconScheduler (every Beacon.Interval)
//!     │       gateway → scan → match → select → render → deliver
//!     └── ConfigRefresher (every Beacon.UpdateInterval)
//!             load → validate → SharedConfig::replace
//! ```
//!
//! The scheduler reads one snapshot per tick; the refresher swaps snapshots
//! atomically. Neither blocks the other.

mod phase;
mod refresher;
mod runtime;
mod scheduler;

pub use phase::{TickPhase, TickReport};
pub use refresher::{ConfigRefresher, RefreshOutcome};
pub use runtime::BeaconRuntime;
pub use scheduler::BeaconScheduler;
