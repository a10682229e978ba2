//! Shared test utilities for docagent integration tests.
//!
//! - scripted in-memory `FileStore` and `GenerationClient` implementations
//! - `TestHarness` wiring them into a `JobService`

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::*;
