//! caribou-test-harness: Test utilities and a mock board transport for
//! caribou.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! channel controller and streaming sessions without a CaribouLite board.

pub mod mock;

pub use mock::MockTransport;
