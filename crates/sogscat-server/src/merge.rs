//! De-duplication of server candidates.
//!
//! Candidates are sorted by a key, then each one is folded into its
//! predecessor when the two are judged to be the same server. Folding runs
//! from the back so that indices of unvisited candidates stay put.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::error::MergeError;
use crate::server::{Scheme, ServerCandidate};

/// Criterion for two candidates being the same server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Equal hostname and port.
    SameHostname,
    /// Equal settled public key and at least one room in common.
    SameIdentity,
}

impl MergeStrategy {
    pub fn should_merge(self, a: &ServerCandidate, b: &ServerCandidate) -> bool {
        match self {
            MergeStrategy::SameHostname => a.hostname(true) == b.hostname(true),
            MergeStrategy::SameIdentity => {
                a.pubkey().is_some() && a.pubkey() == b.pubkey() && rooms_in_common(a, b)
            }
        }
    }

    /// Fold `from` into `into`.
    ///
    /// Room hints are concatenated. HTTPS wins over HTTP, and a domain name
    /// replaces an IP address host.
    pub fn merge(self, into: &mut ServerCandidate, from: ServerCandidate) -> Result<(), MergeError> {
        match self {
            MergeStrategy::SameHostname => {
                if into.hostname(true) != from.hostname(true) {
                    return Err(MergeError::HostnameMismatch {
                        left: into.hostname(true),
                        right: from.hostname(true),
                    });
                }
                let conflict = from
                    .pubkey_candidates
                    .iter()
                    .any(|key| !into.pubkey_candidates.contains(key));
                if into.is_resolved() && from.is_resolved() && conflict {
                    warn!(
                        "Servers at {} disagree on their public key, dropping them.",
                        into.hostname(true)
                    );
                    into.invalidated = true;
                }
                into.pubkey_candidates.extend_from_slice(&from.pubkey_candidates);
                dedup_preserving_order(&mut into.pubkey_candidates);
            }
            MergeStrategy::SameIdentity => {
                if into.pubkey() != from.pubkey() {
                    let show = |s: &ServerCandidate| {
                        s.pubkey().map_or_else(|| "none".to_string(), |key| key.to_string())
                    };
                    return Err(MergeError::PublicKeyMismatch {
                        left: show(into),
                        right: show(&from),
                    });
                }
            }
        }
        into.invalidated |= from.invalidated;
        into.room_hints.extend(from.room_hints);

        if from.scheme == Scheme::Https {
            into.scheme = Scheme::Https;
        }
        if into.is_ip_host() {
            into.host = from.host;
            into.port = from.port;
        }
        Ok(())
    }
}

/// Whether the two servers list a room with the same identity.
///
/// Duplicates within one server count as well.
pub fn rooms_in_common(a: &ServerCandidate, b: &ServerCandidate) -> bool {
    let mut seen = HashSet::new();
    a.rooms()
        .into_iter()
        .chain(b.rooms())
        .flatten()
        .any(|room| !seen.insert(room.identity()))
}

fn merge_adjacent(servers: &mut Vec<ServerCandidate>, strategy: MergeStrategy) -> Result<(), MergeError> {
    for i in (1..servers.len()).rev() {
        if strategy.should_merge(&servers[i], &servers[i - 1]) {
            let duplicate = servers.remove(i);
            debug!("Merging {} into {}", duplicate.base_url(), servers[i - 1].base_url());
            strategy.merge(&mut servers[i - 1], duplicate)?;
        }
    }
    Ok(())
}

fn dedup_preserving_order<T: Clone + Eq + Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Drop invalidated servers and duplicate hints and keys.
fn ensure_merge_consistency(servers: Vec<ServerCandidate>) -> Vec<ServerCandidate> {
    servers
        .into_iter()
        .filter(|server| !server.invalidated)
        .map(|mut server| {
            dedup_preserving_order(&mut server.room_hints);
            dedup_preserving_order(&mut server.pubkey_candidates);
            server
        })
        .collect()
}

/// Merge candidates sharing a hostname.
pub fn dedupe_by_url(mut servers: Vec<ServerCandidate>) -> Result<Vec<ServerCandidate>, MergeError> {
    servers.sort_by_cached_key(|server| server.hostname(true));
    merge_adjacent(&mut servers, MergeStrategy::SameHostname)?;
    Ok(ensure_merge_consistency(servers))
}

/// Merge resolved servers that share a public key and a room.
///
/// Every server must have a settled public key.
pub fn dedupe_by_data(mut servers: Vec<ServerCandidate>) -> Result<Vec<ServerCandidate>, MergeError> {
    if let Some(server) = servers.iter().find(|server| !server.has_pubkey()) {
        server.log_details();
        return Err(MergeError::UnresolvedPublicKey {
            base_url: server.base_url(),
        });
    }
    servers.sort_by_key(ServerCandidate::pubkey);
    merge_adjacent(&mut servers, MergeStrategy::SameIdentity)?;
    Ok(ensure_merge_consistency(servers))
}
