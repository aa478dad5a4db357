//! Integration tests for the DVSPortal client suite
//!
//! This crate contains end-to-end tests that exercise the full stack:
//! - the HTTP client against the mock portal from `dvs_client::testing`
//! - the poll coordinator publishing snapshots and views
//!
//! # Test Structure
//!
//! - `e2e_test.rs` - client + actions + refresh flows against the mock
//! - `watcher_test.rs` - poll coordinator behavior over time

// This crate only contains tests, no library code
