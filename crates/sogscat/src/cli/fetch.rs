use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sogscat_fetch::{HttpClient, ReqwestClient, Scheduler};
use sogscat_server::{ServerCandidate, dedupe_by_data, dedupe_by_url, poll_reachable};
use tracing::{info, warn};

use crate::config::Config;
use crate::sources::{SOURCES, SourcePage, SourceSet};

#[derive(Args, Clone, Debug)]
pub struct FetchArg {
    /// Smaller retry budgets and timeouts; trust known public keys
    #[arg(long)]
    pub fast: bool,
    /// Resolve servers without writing the listing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Listing to write, overriding the configured path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Extra local pages to scan for join links
    #[arg(long = "source-file", value_name = "FILE")]
    pub source_files: Vec<PathBuf>,
    /// Only scan local source files
    #[arg(long)]
    pub no_remote_sources: bool,
}

impl FetchArg {
    pub async fn execute(&self, mut config: Config) -> Result<()> {
        config.fetch.fast |= self.fast;
        let client =
            ReqwestClient::new(config.timeouts()).context("failed to build the HTTP client")?;
        let scheduler = Scheduler::with_options(client, config.scheduler_options());
        let pages: &[SourcePage] = if self.no_remote_sources { &[] } else { &SOURCES };
        let sources = SourceSet {
            pages,
            files: self.source_files.clone(),
            cache_dir: config.paths.cache.clone(),
        };

        let servers = discover(&scheduler, &config, &sources).await?;
        let output = self.output.as_ref().unwrap_or(&config.paths.output);
        super::save(&servers, output, self.dry_run)
    }
}

/// Scrape join links, then resolve and de-duplicate every server found.
pub async fn discover<C: HttpClient>(
    scheduler: &Scheduler<C>,
    config: &Config,
    sources: &SourceSet<'_>,
) -> Result<Vec<ServerCandidate>> {
    let mut candidates = config.known_candidates()?;
    let known = candidates.len();
    for link in sources.join_links(scheduler).await? {
        match ServerCandidate::from_join_url(&link) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!("Skipping join link {link}: {e}"),
        }
    }
    info!("Collected {} candidates ({known} known).", candidates.len());

    let candidates = dedupe_by_url(candidates)?;
    info!("{} candidates after merging by hostname.", candidates.len());

    let resolved = poll_reachable(scheduler, candidates, &config.resolver_config()).await?;
    let servers = dedupe_by_data(resolved)?;
    info!("{} servers after merging by identity.", servers.len());
    Ok(servers)
}
