use std::path::Path;

use anyhow::{Context, Result};
use sogscat_server::{ServerCandidate, count_rooms, write_snapshot};
use tracing::info;

pub mod app;
pub mod fetch;
pub mod merge;
pub mod setup;

/// Write `servers` to `output` unless this is a dry run.
fn save(servers: &[ServerCandidate], output: &Path, dry_run: bool) -> Result<()> {
    info!(
        "Listing {} servers with {} rooms.",
        servers.len(),
        count_rooms(servers)
    );
    if dry_run {
        info!("Dry run, not writing {}.", output.display());
        return Ok(());
    }
    write_snapshot(output, servers)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Wrote {}.", output.display());
    Ok(())
}
