//! CLI command implementations

pub mod healthcheck;
pub mod run;
pub mod serve;
pub mod stack;
