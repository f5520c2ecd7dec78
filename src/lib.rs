//! Passforge - two-pass multi-profile video transcoding
//!
//! This library crate exposes the core functionality for integration testing.

pub mod acquire;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod profile;
