//! Fatal error handling at the process boundary.

use crate::error::QueueError;
use tracing::error;

/// Print a single-line diagnostic and exit with the error's status code.
///
/// `QueueError`s carry their own exit codes (invalid input maps to 2);
/// anything else exits 1. With `-v` the full error chain is shown.
pub fn handle_fatal_error(err: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {err}");

    eprintln!("✗ Error: {err}");

    if verbose >= 1 {
        for (i, cause) in err.chain().skip(1).enumerate() {
            eprintln!("  {}: {cause}", i + 1);
        }
    }

    let exit_code = err
        .downcast_ref::<QueueError>()
        .map(QueueError::exit_code)
        .unwrap_or(1);

    std::process::exit(exit_code)
}
