//! Network resolution of server candidates.
//!
//! Each candidate is resolved by its own [`ServerResolver`], a protocol that
//! walks through these phases, one request at a time:
//!
//! 1. With two or more room hints, probe the base URL for reachability.
//! 2. Fetch the full room list.
//! 3. Failing that, fetch each hinted room on its own.
//! 4. Read the public key off the first room's preview page.
//! 5. Construct the rooms.
//!
//! Any failure ends resolution and drops the candidate. A fall back from
//! HTTPS to HTTP in any phase rewrites the candidate's base URL for all later
//! phases.

use std::sync::Arc;

use sogscat_fetch::{
    BoxTask, Downgrade, Driven, FetchTaskExt, HttpClient, Leaf, Next, Protocol, Request,
    RequestOptions, Response, ResponseFilter, Scheduler, SchedulerError, fetch,
};
use tracing::{debug, error, info, warn};

use crate::join_link::{JoinLink, parse_join_links};
use crate::room::RoomRecord;
use crate::server::ServerCandidate;

/// Retry budgets and request options of a resolution run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Skip re-confirming known public keys and use smaller retry budgets.
    pub fast: bool,
    pub retries_reachability: u32,
    pub retries_rooms: u32,
    /// Preview page retries when no public key is settled.
    pub retries_pubkey: u32,
    /// Preview page retries when a public key is already settled.
    pub retries_pubkey_known: u32,
    pub request_options: RequestOptions,
}

impl ResolverConfig {
    pub fn new(fast: bool) -> Self {
        Self {
            fast,
            retries_reachability: if fast { 2 } else { 4 },
            retries_rooms: if fast { 2 } else { 4 },
            retries_pubkey: if fast { 1 } else { 5 },
            retries_pubkey_known: 1,
            request_options: RequestOptions::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

type Fetch = Downgrade<Option<Response>>;

enum Phase {
    Start,
    Reachability,
    RoomList,
    RoomHint { index: usize, rooms: Vec<RoomRecord> },
    PublicKey { token: String, preview_url: String },
    Done,
}

/// Resolution protocol of a single candidate.
pub struct ServerResolver {
    server: ServerCandidate,
    config: Arc<ResolverConfig>,
    phase: Phase,
}

impl ServerResolver {
    pub fn new(server: ServerCandidate, config: Arc<ResolverConfig>) -> Self {
        Self {
            server,
            config,
            phase: Phase::Start,
        }
    }

    fn get(&self, url: &str) -> sogscat_fetch::Result<Leaf> {
        fetch(url, self.config.request_options.clone())
    }

    fn finish(&mut self, resolved: bool) -> Next<Fetch, Option<ServerCandidate>> {
        self.phase = Phase::Done;
        Next::Finish(resolved.then(|| self.server.clone()))
    }

    fn check_reachability(&mut self) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        let base_url = self.server.base_url();
        info!("Checking reachability for {base_url} first...");
        let probe = Leaf::new(Request::head(&base_url, self.config.request_options.clone())?)
            .with_filter(ResponseFilter::any_status())
            .retryable(self.config.retries_reachability, true)
            .downgradeable();
        self.phase = Phase::Reachability;
        Ok(Next::Fetch(probe.boxed()))
    }

    fn after_reachability(&mut self, fetched: Fetch) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        if fetched.value.is_none() {
            warn!("Reachability test failed by {}.", self.server.base_url());
            return Ok(self.finish(false));
        }
        if fetched.downgraded {
            self.server.downgrade_scheme();
        }
        self.fetch_room_list()
    }

    fn fetch_room_list(&mut self) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        info!("Fetching rooms for {}.", self.server.base_url());
        let task = self
            .get(&self.server.rooms_api_url())?
            .retryable(self.config.retries_rooms, true)
            .downgradeable();
        self.phase = Phase::RoomList;
        Ok(Next::Fetch(task.boxed()))
    }

    fn after_room_list(&mut self, fetched: Fetch) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        let base_url = self.server.base_url();
        let Some(response) = fetched.value.filter(|r| !r.body().is_empty()) else {
            info!("Failed fetching /rooms for {base_url}.");
            return self.fetch_room_hint(0, Vec::new());
        };
        if fetched.downgraded {
            self.server.downgrade_scheme();
        }
        match response.json::<Vec<RoomRecord>>() {
            Ok(rooms) if !rooms.is_empty() => {
                debug!("Fetched /rooms successfully for {base_url}");
                self.server.set_fetched_rooms(rooms);
                self.fetch_public_key()
            }
            _ => {
                info!("Failed parsing /rooms for {base_url}.");
                self.fetch_room_hint(0, Vec::new())
            }
        }
    }

    fn fetch_room_hint(
        &mut self,
        index: usize,
        rooms: Vec<RoomRecord>,
    ) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        let base_url = self.server.base_url();
        if self.server.room_hints().is_empty() {
            debug!("No room hints to scan for {base_url}.");
            warn!("Could not fetch rooms for {base_url}.");
            return Ok(self.finish(false));
        }
        let Some(token) = self.server.room_hints().get(index) else {
            return self.finish_room_hints(rooms);
        };
        debug!("Testing room /{token} at {base_url}.");
        let task = self
            .get(&self.server.room_api_url(token))?
            .retryable(self.config.retries_rooms, true)
            .downgradeable();
        self.phase = Phase::RoomHint { index, rooms };
        Ok(Next::Fetch(task.boxed()))
    }

    fn after_room_hint(
        &mut self,
        index: usize,
        mut rooms: Vec<RoomRecord>,
        fetched: Fetch,
    ) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        let base_url = self.server.base_url();
        let token = self.server.room_hints()[index].clone();
        let Some(response) = fetched.value.filter(|r| !r.body().is_empty()) else {
            info!("Room /{token} not reachable at {base_url}.");
            return self.fetch_room_hint(index + 1, rooms);
        };
        if fetched.downgraded {
            self.server.downgrade_scheme();
        }
        match response.json::<RoomRecord>() {
            Ok(room) => {
                rooms.push(room);
                self.fetch_room_hint(index + 1, rooms)
            }
            Err(_) if rooms.is_empty() => {
                info!("Room /{token} not parsable at {base_url}.");
                self.finish_room_hints(rooms)
            }
            Err(_) => {
                debug!("Room /{token} not parsable at {base_url}, continuing.");
                self.fetch_room_hint(index + 1, rooms)
            }
        }
    }

    fn finish_room_hints(&mut self, rooms: Vec<RoomRecord>) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        if rooms.is_empty() {
            let base_url = self.server.base_url();
            debug!("No room hints were valid at {base_url}.");
            warn!("Could not fetch rooms for {base_url}.");
            return Ok(self.finish(false));
        }
        self.server.set_fetched_rooms(rooms);
        self.fetch_public_key()
    }

    fn fetch_public_key(&mut self) -> sogscat_fetch::Result<Next<Fetch, Option<ServerCandidate>>> {
        let Some(token) = self.server.fetched_rooms().first().map(|room| room.token.clone()) else {
            warn!("Server {} has no rooms to poll for public key", self.server.base_url());
            return Ok(self.finish(false));
        };
        let has_pubkey = self.server.has_pubkey();
        if has_pubkey && self.config.fast {
            return Ok(self.construct());
        }

        let preview_url = self.server.preview_url(&token);
        info!("Fetching pubkey from {preview_url}");
        let retries = if has_pubkey || self.config.fast {
            self.config.retries_pubkey_known
        } else {
            self.config.retries_pubkey
        };
        let task = self
            .get(&preview_url)?
            .retryable(retries, true)
            .map(|value| Downgrade {
                value,
                downgraded: false,
            });
        self.phase = Phase::PublicKey { token, preview_url };
        Ok(Next::Fetch(task.boxed()))
    }

    fn after_public_key(&mut self, token: &str, preview_url: &str, fetched: Fetch) -> Next<Fetch, Option<ServerCandidate>> {
        let has_pubkey = self.server.has_pubkey();
        let Some(response) = fetched.value.filter(|r| !r.body().is_empty()) else {
            debug!("Failed to fetch room preview from {preview_url}.");
            return self.settle(has_pubkey);
        };

        let links = parse_join_links(&response.text());
        let fragment = self.server.join_url_fragment(token);
        let link = links
            .iter()
            .find(|link| link.contains(&fragment))
            .or(links.first());
        let Some(link) = link else {
            debug!("Could not locate join link in preview at {preview_url}.");
            return self.settle(has_pubkey);
        };
        let pubkey = match JoinLink::parse(link) {
            Ok(link) => link.pubkey(),
            Err(e) => {
                debug!("Unusable join link in preview at {preview_url}: {e}");
                return self.settle(has_pubkey);
            }
        };

        if !self.server.set_pubkey(pubkey) {
            let known = self
                .server
                .pubkey()
                .map_or_else(|| "none".to_string(), |key| key.to_string());
            error!(
                "Key mismatch for {}: Have {known}, fetched {pubkey} from {preview_url}",
                self.server.base_url()
            );
            return self.finish(false);
        }
        self.construct()
    }

    /// Finish with whatever key was settled before the preview.
    fn settle(&mut self, has_pubkey: bool) -> Next<Fetch, Option<ServerCandidate>> {
        if has_pubkey {
            self.construct()
        } else {
            warn!("Could not determine public key of {}.", self.server.base_url());
            self.finish(false)
        }
    }

    fn construct(&mut self) -> Next<Fetch, Option<ServerCandidate>> {
        match self.server.construct_rooms() {
            Ok(()) => self.finish(true),
            Err(e) => {
                error!("{e}");
                self.finish(false)
            }
        }
    }
}

impl Protocol for ServerResolver {
    type Sub = Fetch;
    type Output = Option<ServerCandidate>;

    fn resume(&mut self, finished: Option<Fetch>) -> sogscat_fetch::Result<Next<Fetch, Self::Output>> {
        let phase = std::mem::replace(&mut self.phase, Phase::Done);
        let Some(fetched) = finished else {
            return match phase {
                Phase::Start => {
                    self.server.log_details();
                    if self.server.room_hints().len() >= 2 {
                        self.check_reachability()
                    } else {
                        self.fetch_room_list()
                    }
                }
                _ => Err(sogscat_fetch::FetchError::MissingResult),
            };
        };
        match phase {
            Phase::Reachability => self.after_reachability(fetched),
            Phase::RoomList => self.after_room_list(fetched),
            Phase::RoomHint { index, rooms } => self.after_room_hint(index, rooms, fetched),
            Phase::PublicKey { token, preview_url } => {
                Ok(self.after_public_key(&token, &preview_url, fetched))
            }
            Phase::Start => Err(sogscat_fetch::FetchError::UnexpectedResult),
            Phase::Done => Err(sogscat_fetch::FetchError::TaskFinished),
        }
    }
}

/// Fetch task resolving `server`; finishes with the server if it resolved.
pub fn resolve_task(
    server: ServerCandidate,
    config: Arc<ResolverConfig>,
) -> BoxTask<Option<ServerCandidate>> {
    Driven::new(ServerResolver::new(server, config)).boxed()
}

/// Resolve all candidates concurrently and keep those that resolved.
pub async fn poll_reachable<C: HttpClient>(
    scheduler: &Scheduler<C>,
    servers: Vec<ServerCandidate>,
    config: &ResolverConfig,
) -> Result<Vec<ServerCandidate>, SchedulerError> {
    let total = servers.len();
    let config = Arc::new(config.clone());
    let tasks = servers
        .into_iter()
        .map(|server| resolve_task(server, Arc::clone(&config)))
        .collect();
    let resolved: Vec<_> = scheduler.run_all(tasks).await?.into_iter().flatten().collect();
    info!("Resolved {} of {total} servers.", resolved.len());
    Ok(resolved)
}
