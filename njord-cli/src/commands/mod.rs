//! CLI command implementations.
//!
//! - [`run`] - Beacon until interrupted
//! - [`probe`] - Single tick, sentences printed to stdout
//! - [`common`] - Arguments shared by both

pub mod common;
pub mod probe;
pub mod run;
