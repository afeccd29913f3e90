//! Application module
//!
//! Application-level plumbing shared by every entry into the binary:
//! - Configuration handling (verbosity)
//! - Logging setup
//! - Fatal error handling

pub mod config;
pub mod error_handling;
pub mod logging;

pub use config::AppConfig;
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
