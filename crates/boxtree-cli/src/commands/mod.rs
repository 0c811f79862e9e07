//! CLI subcommands

pub mod config;
pub mod shell;
pub mod tree;
pub mod whoami;
