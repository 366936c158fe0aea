//! Position sources and selection.
//!
//! Each beacon tick reads one [`GatewayFix`], optionally pools WiFi scan
//! matches, and reduces both to a single [`AuthoritativeFix`] via
//! [`select_fix`].

mod selector;
mod state;

pub use selector::{select_fix, FixQuality, HdopThresholds, SelectionError};
pub use state::{AuthoritativeFix, FixSource, GatewayFix};
