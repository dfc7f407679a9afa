//! End-to-end scenarios for the HRMS client core.

mod harness;
mod scenarios;
