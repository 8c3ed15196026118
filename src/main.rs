use anyhow::Result;
use focus_tracker::{cli::run_cli, utils::runtime::multi_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    multi_thread_runtime()?
        .block_on(run_cli())
        .inspect_err(|e| {
            error!("Error running cli {e:?}");
        })?;
    Ok(())
}
