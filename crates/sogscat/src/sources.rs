//! Pages that join links are scraped from.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sogscat_fetch::{FetchTaskExt, HttpClient, RequestOptions, Scheduler, fetch};
use sogscat_server::parse_join_links;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePage {
    /// Name of the page's cache file.
    pub key: &'static str,
    pub url: &'static str,
}

pub const SOURCES: [SourcePage; 2] = [
    SourcePage {
        key: "SIMP",
        url: "https://simplifiedprivacy.com/techgroups",
    },
    SourcePage {
        key: "EURO",
        url: "https://euroexit.net",
    },
];

const SOURCE_RETRIES: u32 = 2;

/// Where the text of a scrape comes from.
#[derive(Debug, Clone)]
pub struct SourceSet<'a> {
    pub pages: &'a [SourcePage],
    pub files: Vec<PathBuf>,
    pub cache_dir: PathBuf,
}

impl SourceSet<'_> {
    fn cache_path(&self, page: &SourcePage) -> PathBuf {
        self.cache_dir.join("sources").join(page.key)
    }

    /// Fetch every page concurrently, read the extra files, and return the
    /// join links found in all of them, sorted and unique.
    ///
    /// A page that cannot be fetched is read from its cached copy instead.
    pub async fn join_links<C: HttpClient>(&self, scheduler: &Scheduler<C>) -> Result<Vec<String>> {
        let mut tasks = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            let key = page.key;
            let task = fetch(page.url, RequestOptions::default())
                .with_context(|| format!("invalid source url {}", page.url))?
                .retryable(SOURCE_RETRIES, true)
                .map(move |response| (key, response));
            tasks.push(task.boxed());
        }

        let mut text = String::new();
        for (key, response) in scheduler.run_all(tasks).await? {
            let Some(page) = self.pages.iter().find(|page| page.key == key) else {
                continue;
            };
            let path = self.cache_path(page);
            match response {
                Some(response) => {
                    let body = response.text();
                    debug!("Fetched source {key} ({} bytes)", body.len());
                    if let Err(e) = write_atomic(&path, body.as_bytes()) {
                        warn!("Could not cache source {key}: {e:#}");
                    }
                    text.push_str(&body);
                }
                None => match std::fs::read_to_string(&path) {
                    Ok(cached) => {
                        warn!("Source {key} unreachable, using cached copy");
                        text.push_str(&cached);
                    }
                    Err(_) => warn!("Source {key} unreachable and not cached"),
                },
            }
            text.push('\n');
        }

        for file in &self.files {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read source file {}", file.display()))?;
            text.push_str(&content);
            text.push('\n');
        }

        let links = parse_join_links(&text);
        info!("Found {} join links.", links.len());
        Ok(links)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.persist(path)?;
    Ok(())
}
