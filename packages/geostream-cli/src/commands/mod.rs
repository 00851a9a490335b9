pub mod groups;
pub mod publish;
pub mod subscribe;

use crate::exit_codes;
use geostream::FeedError;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, shutting down");
            token.cancel();
        }
    });
}

/// Map a startup failure to its exit code
pub fn startup_exit_code(error: &FeedError) -> i32 {
    match error {
        FeedError::Load(_) | FeedError::Config(_) => exit_codes::INPUT_ERROR,
        FeedError::Bind(_) | FeedError::Connect(_) => exit_codes::TRANSPORT_ERROR,
        _ => exit_codes::RUNTIME_ERROR,
    }
}
