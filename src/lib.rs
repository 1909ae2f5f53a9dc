//! Streamvisor - live UDP to HLS channel supervisor
//!
//! This library crate exposes the core functionality for integration testing.

pub mod bootstrap;
pub mod cleaner;
pub mod config;
pub mod events;
pub mod server;
pub mod supervisor;
