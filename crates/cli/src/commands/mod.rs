// Path: crates/cli/src/commands/mod.rs

pub mod config;
pub mod evaluate;
pub mod query;
pub mod report;
