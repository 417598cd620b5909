//! Shared test utilities
//!
//! - A fake system preloaded with a realistic starting state
//! - Orchestrator rigs wired to that fake with instant settle and short waits

#![allow(dead_code)]

pub mod fixtures;
