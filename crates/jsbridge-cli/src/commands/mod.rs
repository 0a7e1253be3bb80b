//! CLI command implementations.

pub mod call;
pub mod console;
pub mod run;
