//! Mood Journal
//!
//! Configuration shared by the `mood` CLI and the development diary server
//! behind `mood-server`.

pub mod config;
pub mod server;
