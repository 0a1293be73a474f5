//! Strata library
//!
//! Layered configuration resolution and the build command tree, exported for
//! the `strata` binary and for testing.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod template;
pub mod tools;
