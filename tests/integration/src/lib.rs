//! Integration test utilities for the consultation client
//!
//! This crate provides an in-process backend emulating the token endpoints and the
//! chat socket, plus helpers for running end-to-end tests against it.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
