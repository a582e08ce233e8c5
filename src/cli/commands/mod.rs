//! CLI command implementations.
//!
//! Each command is implemented in its own module with a `run` function
//! that handles the command logic.

pub mod config;
pub mod replay;
pub mod stream;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancellation token fired by Ctrl-C.
///
/// Ends sessions at the next chunk boundary; records already handed to a
/// sink are still written.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            trigger.cancel();
        }
    });
    token
}
