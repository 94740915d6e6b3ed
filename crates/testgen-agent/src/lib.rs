//! Test generation agent
//!
//! Wires the `testgen-core` feedback loop to an OpenAI-compatible chat
//! completions endpoint, a command-line compiler and the local filesystem.

pub mod cli;
pub mod client;
pub mod config;
pub mod session;
