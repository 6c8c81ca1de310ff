//! Integration test suite for the kombajn batch pipeline.
//!
//! These tests run full batches through the engine and pool with
//! scripted adapters standing in for the external OSINT tools, so they
//! never touch the network or spawn real subprocesses and are safe in CI.
//!
//! # Test Categories
//!
//! - `batch_execution`: ordering, concurrency, retry, and metrics
//! - `cancellation`: cooperative shutdown semantics

mod fixtures;

mod batch_execution;
mod cancellation;
