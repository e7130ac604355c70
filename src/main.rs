//! # Backplane Operator
//!
//! Entry point: initializes the runtime and runs the watch loop until shutdown.

use backplane_operator::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.engines,
        init.watched_kinds,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
