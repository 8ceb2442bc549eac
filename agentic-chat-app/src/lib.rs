//! Command-line front end for the agentic chat runtime.

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod repl;
