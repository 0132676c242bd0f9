use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sogscat_server::{ServerCandidate, dedupe_by_data, dedupe_by_url, read_snapshot};
use tracing::info;

use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct MergeArg {
    /// Listings to merge
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Listing to write, overriding the configured path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Merge without writing the result
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl MergeArg {
    pub fn execute(&self, config: &Config) -> Result<()> {
        let servers = merge_listings(&self.inputs)?;
        let output = self.output.as_ref().unwrap_or(&config.paths.output);
        super::save(&servers, output, self.dry_run)
    }
}

/// Read every listing and merge their servers as a fetch run would.
pub fn merge_listings(inputs: &[PathBuf]) -> Result<Vec<ServerCandidate>> {
    let mut servers = Vec::new();
    for input in inputs {
        let listing = read_snapshot(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        info!("Read {} servers from {}.", listing.len(), input.display());
        servers.extend(listing);
    }
    let servers = dedupe_by_url(servers)?;
    Ok(dedupe_by_data(servers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sogscat_server::{PublicKey, RoomRecord, write_snapshot};

    const KEY: &str = "a03c383cf63c3c4efe67acc52112a6dd734b3a946b9545f488aaa93da7991238";
    const OTHER: &str = "b03c383cf63c3c4efe67acc52112a6dd734b3a946b9545f488aaa93da7991238";

    fn server(base_url: &str, key: &str, tokens: &[&str]) -> ServerCandidate {
        let pubkey: PublicKey = key.parse().unwrap();
        let rooms = tokens
            .iter()
            .map(|token| RoomRecord::new(*token).created(1690000000.0))
            .collect();
        ServerCandidate::resolved(base_url, pubkey, rooms).unwrap()
    }

    #[test]
    fn test_merge_listings_collapses_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        write_snapshot(&first, &[server("https://sog.example", KEY, &["lounge"])]).unwrap();
        write_snapshot(
            &second,
            &[
                server("http://203.0.113.7", KEY, &["lounge"]),
                server("https://other.example", OTHER, &["dev"]),
            ],
        )
        .unwrap();

        let merged = merge_listings(&[first, second]).unwrap();
        let mut urls: Vec<_> = merged.iter().map(ServerCandidate::base_url).collect();
        urls.sort();
        assert_eq!(urls, ["https://other.example", "https://sog.example"]);
    }

    #[test]
    fn test_server_in_every_listing_survives() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<_> = ["a.json", "b.json", "c.json"]
            .into_iter()
            .map(|name| {
                let path = dir.path().join(name);
                write_snapshot(&path, &[server("https://sog.example", KEY, &["lounge"])]).unwrap();
                path
            })
            .collect();

        let merged = merge_listings(&inputs).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].base_url(), "https://sog.example");
    }

    #[test]
    fn test_merge_listings_reports_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = merge_listings(&[dir.path().join("missing.json")]).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        crate::cli::save(&[server("https://sog.example", KEY, &["lounge"])], &output, true).unwrap();
        assert!(!output.exists());
        crate::cli::save(&[server("https://sog.example", KEY, &["lounge"])], &output, false).unwrap();
        assert!(output.exists());
    }
}
