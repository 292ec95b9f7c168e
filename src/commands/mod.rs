//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct (clap
//! derive) and an `execute` function that calls into the `drift_tracker`
//! library.

pub mod track;
