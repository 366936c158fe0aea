//! Tick phases and per-tick reporting.

use std::fmt;

use crate::position::{AuthoritativeFix, GatewayFix, SelectionError};
use crate::sink::DispatchReport;

/// Phase of a beacon tick.
///
/// A tick producing a fix walks `Idle → Scanning → Selecting → Encoding →
/// Dispatching → Idle`. Scanning is skipped for an excellent gateway fix, and
/// a tick without a fix returns to `Idle` straight from `Selecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickPhase {
    Idle,
    Scanning,
    Selecting,
    Encoding,
    Dispatching,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TickPhase::Idle => "IDLE",
            TickPhase::Scanning => "SCANNING",
            TickPhase::Selecting => "SELECTING",
            TickPhase::Encoding => "ENCODING",
            TickPhase::Dispatching => "DISPATCHING",
        };
        f.write_str(name)
    }
}

/// What happened during one tick.
#[derive(Debug)]
pub struct TickReport {
    /// Phases visited, in order.
    pub phases: Vec<TickPhase>,

    /// Configuration generation the tick ran against.
    pub generation: u64,

    /// Gateway reading used for selection (unavailable on read failure).
    pub gateway: GatewayFix,

    /// WiFi scans performed.
    pub scans: u32,

    /// Outcome of source selection.
    pub selection: Result<AuthoritativeFix, SelectionError>,

    /// Delivery results; `None` when no fix was produced.
    pub dispatch: Option<DispatchReport>,
}

impl TickReport {
    /// The authoritative fix, if one was produced.
    pub fn fix(&self) -> Option<&AuthoritativeFix> {
        self.selection.as_ref().ok()
    }

    /// True when the tick visited `phase`.
    pub fn visited(&self, phase: TickPhase) -> bool {
        self.phases.contains(&phase)
    }

    /// Phases joined as `IDLE -> SCANNING -> ...`.
    pub fn path(&self) -> String {
        self.phases
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
