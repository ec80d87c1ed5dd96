//! Plinth benchmarking suite
//!
//! Benchmarks for version matching, dependency resolution, conflict
//! detection, install ordering and package archive handling.

pub mod common;

pub use common::*;
