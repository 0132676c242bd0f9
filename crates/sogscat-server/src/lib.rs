//! Discovery, resolution and de-duplication of Session community servers.
//!
//! Servers are first learned as [`ServerCandidate`]s from join links and
//! known hosts. Candidates sharing a hostname are merged, every remaining
//! candidate is resolved over the network concurrently, and resolved servers
//! that turn out to be the same machine under different names are merged
//! once more by public key and shared rooms.

mod error;
mod join_link;
mod merge;
mod resolver;
mod room;
mod server;
mod snapshot;

pub use error::{MergeError, Result, ServerError};
pub use join_link::{JoinLink, PublicKey, base_url_of, parse_join_links};
pub use merge::{MergeStrategy, dedupe_by_data, dedupe_by_url, rooms_in_common};
pub use resolver::{ResolverConfig, ServerResolver, poll_reachable, resolve_task};
pub use room::{RoomIdentity, RoomRecord};
pub use server::{Scheme, ServerCandidate};
pub use snapshot::{
    ServerRecord, count_rooms, from_records, read_snapshot, to_records, write_snapshot,
};
