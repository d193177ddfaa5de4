pub mod activities;
pub mod config;
pub mod ls;
pub mod offline;
pub mod path;
pub mod report;
pub mod search;
pub mod special;
pub mod sweep;

use tokio_util::sync::CancellationToken;

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping after the current page");
            child.cancel();
        }
    });
    token
}
