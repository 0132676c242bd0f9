//! Persisted server listings.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::join_link::PublicKey;
use crate::room::RoomRecord;
use crate::server::ServerCandidate;

/// On-disk form of a resolved server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub base_url: String,
    pub pubkey: PublicKey,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
}

impl ServerCandidate {
    /// Fails unless the server is resolved.
    pub fn to_record(&self) -> Result<ServerRecord> {
        match (self.pubkey(), self.rooms()) {
            (Some(pubkey), Some(rooms)) => Ok(ServerRecord {
                base_url: self.base_url(),
                pubkey,
                rooms: rooms.to_vec(),
            }),
            _ => Err(ServerError::UnresolvedPublicKey(self.base_url())),
        }
    }

    pub fn from_record(record: ServerRecord) -> Result<Self> {
        Self::resolved(&record.base_url, record.pubkey, record.rooms)
    }
}

pub fn to_records(servers: &[ServerCandidate]) -> Result<Vec<ServerRecord>> {
    servers.iter().map(ServerCandidate::to_record).collect()
}

pub fn from_records(records: Vec<ServerRecord>) -> Result<Vec<ServerCandidate>> {
    records.into_iter().map(ServerCandidate::from_record).collect()
}

/// Write `servers` as a JSON array, replacing `path` atomically.
pub fn write_snapshot(path: &Path, servers: &[ServerCandidate]) -> Result<()> {
    let records = to_records(servers)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut file, &records)?;
    file.flush()?;
    file.persist(path).map_err(|e| ServerError::Io(e.error))?;
    debug!("Wrote {} servers to {}", records.len(), path.display());
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Vec<ServerCandidate>> {
    let raw = std::fs::read(path)?;
    let records: Vec<ServerRecord> = serde_json::from_slice(&raw)?;
    from_records(records)
}

/// Rooms that ordinary users can read or write, over all `servers`.
pub fn count_rooms(servers: &[ServerCandidate]) -> usize {
    servers
        .iter()
        .flat_map(|server| server.rooms().unwrap_or_default())
        .filter(|room| !room.is_off_record())
        .count()
}
