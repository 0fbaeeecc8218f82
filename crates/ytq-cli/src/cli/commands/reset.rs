//! `ytq reset --yes` – empty every table and reset id counters.

use anyhow::Result;
use ytq_core::store::JobStore;

use crate::cli::app::App;
use crate::cli::output::Output;

pub async fn run_reset(app: &App, out: &Output, yes: bool) -> Result<()> {
    if !yes {
        return Err(out.fail(
            "CONFIRMATION_REQUIRED",
            anyhow::anyhow!("reset deletes every job and channel; pass --yes to confirm"),
        ));
    }
    app.store
        .clean_tables()
        .await
        .map_err(|e| out.fail("STORE_ERROR", e))?;
    app.store
        .reset_sequence()
        .await
        .map_err(|e| out.fail("STORE_ERROR", e))?;
    tracing::info!("database reset");
    out.value("reset", |_| println!("All jobs, tasks and channels deleted."))
}
