//! Library surface for the `aimo` binary.
//!
//! `main.rs` only invokes [`cli::run`]; all argument parsing, configuration
//! discovery, and pipeline dispatch live here so they can be exercised by
//! integration tests without spawning a subprocess.

pub mod cli;
