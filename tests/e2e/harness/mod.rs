//! E2E test harness for the HRMS client core.
//!
//! Scenarios wire the real cache, client, bootstrap and search against the
//! in-memory record service and run under tokio's paused clock.

#![allow(dead_code)]

pub mod runner;
pub mod steps;

pub use assertions::{Assertion, SessionStateMatch};
pub use scenario::Scenario;
pub use steps::Read;
