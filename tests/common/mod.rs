//! Shared test utilities for integration tests.
//! Not compiled as a test binary itself; included by the test files.
#![allow(dead_code)]

pub mod fixtures;
pub mod mock;
