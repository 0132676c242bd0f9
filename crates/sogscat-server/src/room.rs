use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Room metadata as served by a community server's `/room` endpoints.
///
/// Every field except the token is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admins: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub moderators: Vec<String>,
    /// Creation time in seconds since the epoch.
    #[serde(default)]
    pub created: Option<f64>,
    #[serde(default)]
    pub active_users: Option<u64>,
    #[serde(default)]
    pub active_users_cutoff: Option<u64>,
    #[serde(default)]
    pub image_id: Option<u64>,
    #[serde(default)]
    pub info_updates: Option<u64>,
    #[serde(default)]
    pub message_sequence: Option<u64>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub write: Option<bool>,
    #[serde(default)]
    pub upload: Option<bool>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Key identifying a room across servers: token and creation time.
pub type RoomIdentity<'a> = (&'a str, Option<u64>);

impl RoomRecord {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: None,
            description: None,
            admins: Vec::new(),
            moderators: Vec::new(),
            created: None,
            active_users: None,
            active_users_cutoff: None,
            image_id: None,
            info_updates: None,
            message_sequence: None,
            read: None,
            write: None,
            upload: None,
        }
    }

    #[must_use]
    pub fn created(mut self, created: f64) -> Self {
        self.created = Some(created);
        self
    }

    /// Two records with equal identities describe the same room.
    pub fn identity(&self) -> RoomIdentity<'_> {
        (&self.token, self.created.map(f64::to_bits))
    }

    /// Neither readable nor writable by ordinary users. Missing flags count as denied.
    pub fn is_off_record(&self) -> bool {
        !self.read.unwrap_or(false) && !self.write.unwrap_or(false)
    }

    /// Admins followed by moderators, each listed once.
    pub fn staff(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.admins
            .iter()
            .chain(&self.moderators)
            .map(String::as_str)
            .filter(move |id| seen.insert(*id))
    }
}
