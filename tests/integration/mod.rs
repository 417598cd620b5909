//! Integration tests for the launcher
//!
//! These drive the orchestrator and workload monitor end to end against the
//! in-memory platform.

#[path = "../common/mod.rs"]
pub mod common;

pub mod boost_cycle;
pub mod modes;
pub mod workload_flow;
