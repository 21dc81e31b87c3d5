//! flagsync CLI library
//!
//! Exposes the command implementations and their support modules so the
//! binary stays thin and integration tests can load configurations directly.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
