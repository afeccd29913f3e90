//! Command-line interface: argument structures and routing.

pub mod args;
pub mod output;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;
