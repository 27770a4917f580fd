//! Command implementations for the hdiff CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod diff;
pub mod parse;
