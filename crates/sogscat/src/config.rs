use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use sogscat_fetch::{SchedulerOptions, Timeouts};
use sogscat_server::{PublicKey, ResolverConfig, ServerCandidate};

pub const DEFAULT_CONFIG_FILE: &str = "sogscat.toml";
const ENV_PREFIX: &str = "SOGSCAT_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchSettings,
    pub paths: Paths,
    pub known_servers: BTreeMap<String, KnownServer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub fast: bool,
    /// Overrides the connect deadline of the selected mode.
    pub connect_timeout_ms: Option<u64>,
    /// Overrides the total deadline of the selected mode.
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            fast: false,
            connect_timeout_ms: None,
            timeout_ms: None,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub output: PathBuf,
    pub cache: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output/servers.json"),
            cache: PathBuf::from("cache-lt"),
        }
    }
}

/// A server crawled even when no source page links to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownServer {
    pub pubkey: Option<String>,
}

impl Config {
    /// Defaults, then `path` if it exists, then `SOGSCAT_*` variables.
    ///
    /// Nested keys are separated by a double underscore, as in
    /// `SOGSCAT_FETCH__FAST=true`.
    pub fn load(path: &Path) -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    pub fn timeouts(&self) -> Timeouts {
        let mut timeouts = Timeouts::for_mode(self.fetch.fast);
        if let Some(ms) = self.fetch.connect_timeout_ms {
            timeouts.connect = Duration::from_millis(ms);
        }
        if let Some(ms) = self.fetch.timeout_ms {
            timeouts.total = Duration::from_millis(ms);
        }
        timeouts
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            poll_interval: Duration::from_millis(self.fetch.poll_interval_ms.max(1)),
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(self.fetch.fast)
    }

    /// Candidates for every known server.
    ///
    /// Fails if any known server lacks a valid public key.
    pub fn known_candidates(&self) -> Result<Vec<ServerCandidate>> {
        let mut candidates = Vec::with_capacity(self.known_servers.len());
        for (base_url, known) in &self.known_servers {
            let Some(pubkey) = &known.pubkey else {
                bail!("known server {base_url} has no public key");
            };
            let pubkey: PublicKey = pubkey
                .parse()
                .with_context(|| format!("known server {base_url}"))?;
            candidates.push(
                ServerCandidate::from_known_host(base_url, pubkey)
                    .with_context(|| format!("known server {base_url}"))?,
            );
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const KEY: &str = "a03c383cf63c3c4efe67acc52112a6dd734b3a946b9545f488aaa93da7991238";

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_| {
            let config = Config::load(Path::new("missing.toml")).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(config.timeouts(), Timeouts::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sogscat.toml",
                &format!(
                    r#"
                    [fetch]
                    timeout_ms = 5000

                    [paths]
                    output = "out/all.json"

                    [known_servers."https://open.getsession.org"]
                    pubkey = "{KEY}"
                    "#
                ),
            )?;
            jail.set_env("SOGSCAT_FETCH__FAST", "true");

            let config = Config::load(Path::new("sogscat.toml")).unwrap();
            assert!(config.fetch.fast);
            assert_eq!(config.paths.output, PathBuf::from("out/all.json"));
            assert_eq!(config.paths.cache, PathBuf::from("cache-lt"));
            assert_eq!(config.timeouts().total, Duration::from_millis(5000));
            assert_eq!(config.resolver_config().retries_pubkey, 1);

            let known = config.known_candidates().unwrap();
            assert_eq!(known.len(), 1);
            assert_eq!(known[0].pubkey().map(|k| k.to_string()).as_deref(), Some(KEY));
            Ok(())
        });
    }

    #[test]
    fn test_known_server_without_key_is_fatal() {
        let mut config = Config::default();
        config
            .known_servers
            .insert("https://sog.example".to_string(), KnownServer::default());
        let err = config.known_candidates().unwrap_err();
        assert!(err.to_string().contains("https://sog.example"));
    }

    #[test]
    fn test_known_server_with_bad_key_is_fatal() {
        let mut config = Config::default();
        config.known_servers.insert(
            "https://sog.example".to_string(),
            KnownServer {
                pubkey: Some("zz".to_string()),
            },
        );
        assert!(config.known_candidates().is_err());
    }
}
