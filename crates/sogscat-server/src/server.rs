//! Server candidates: what is known about one community server.

use std::fmt;

use tracing::{debug, info};
use url::{Host, Url};

use crate::error::{Result, ServerError};
use crate::join_link::{JoinLink, PublicKey};
use crate::room::RoomRecord;

/// URL scheme of a server's base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A community server as discovered, then resolved.
///
/// Candidates start out with whatever a join link or known host tells about
/// them: a base URL, public key guesses and room tokens. Resolution adds the
/// fetched room list, settles on a single public key and finally constructs
/// the server's rooms.
#[derive(Debug, Clone)]
pub struct ServerCandidate {
    pub(crate) scheme: Scheme,
    pub(crate) host: Host<String>,
    pub(crate) port: Option<u16>,
    pub(crate) pubkey_candidates: Vec<PublicKey>,
    pub(crate) room_hints: Vec<String>,
    pub(crate) fetched_rooms: Vec<RoomRecord>,
    pub(crate) rooms: Option<Vec<RoomRecord>>,
    pub(crate) invalidated: bool,
}

impl ServerCandidate {
    /// Candidate with a base URL and nothing else.
    pub fn new(base_url: &str) -> Result<Self> {
        let invalid = |reason: &str| ServerError::InvalidUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        let scheme = Scheme::parse(url.scheme()).ok_or_else(|| invalid("not an HTTP URL"))?;
        let host = url.host().ok_or_else(|| invalid("missing host"))?.to_owned();
        Ok(Self {
            scheme,
            host,
            port: url.port(),
            pubkey_candidates: Vec::new(),
            room_hints: Vec::new(),
            fetched_rooms: Vec::new(),
            rooms: None,
            invalidated: false,
        })
    }

    /// Candidate learned from a join link found in the wild.
    pub fn from_join_link(link: &JoinLink) -> Result<Self> {
        let mut server = Self::new(link.base_url())?;
        server.pubkey_candidates.push(link.pubkey());
        server.room_hints.push(link.token().to_string());
        Ok(server)
    }

    pub fn from_join_url(join_url: &str) -> Result<Self> {
        Self::from_join_link(&JoinLink::parse(join_url)?)
    }

    /// Candidate for a server whose public key is known in advance.
    pub fn from_known_host(base_url: &str, pubkey: PublicKey) -> Result<Self> {
        let mut server = Self::new(base_url)?;
        server.pubkey_candidates.push(pubkey);
        Ok(server)
    }

    /// Fully resolved server, as read back from a snapshot.
    pub fn resolved(base_url: &str, pubkey: PublicKey, rooms: Vec<RoomRecord>) -> Result<Self> {
        let mut server = Self::from_known_host(base_url, pubkey)?;
        server.rooms = Some(rooms);
        Ok(server)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name, with the port when asked for and not the scheme default.
    pub fn hostname(&self, include_port: bool) -> String {
        match self.port {
            Some(port) if include_port => format!("{}:{port}", self.host),
            _ => self.host.to_string(),
        }
    }

    /// `scheme://host[:port]`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.hostname(true))
    }

    pub fn is_ip_host(&self) -> bool {
        !matches!(self.host, Host::Domain(_))
    }

    /// Switch the base URL to plain HTTP for good.
    pub fn downgrade_scheme(&mut self) {
        if self.scheme == Scheme::Https {
            info!("Downgrading {} to HTTP.", self.base_url());
            self.scheme = Scheme::Http;
        }
    }

    pub fn rooms_api_url(&self) -> String {
        format!("{}/rooms?all=1", self.base_url())
    }

    pub fn room_api_url(&self, token: &str) -> String {
        format!("{}/room/{token}", self.base_url())
    }

    /// Browser preview page of a room.
    pub fn preview_url(&self, token: &str) -> String {
        format!("{}/r/{token}", self.base_url())
    }

    pub fn invite_url(&self, token: &str) -> String {
        format!("{}/r/{token}/invite.png", self.base_url())
    }

    /// In-app join URL of a room; needs a settled public key.
    pub fn join_url(&self, token: &str) -> Option<String> {
        let pubkey = self.pubkey()?;
        Some(format!("{}/{token}?public_key={pubkey}", self.base_url()))
    }

    /// Scheme-less part of a room's join URL, up to the key.
    pub fn join_url_fragment(&self, token: &str) -> String {
        format!("{}/{token}?public_key=", self.hostname(true))
    }

    pub fn icon_url(&self, room: &RoomRecord) -> Option<String> {
        let image_id = room.image_id?;
        Some(format!("{}/room/{}/file/{image_id}", self.base_url(), room.token))
    }

    /// The public key, once exactly one candidate remains.
    pub fn pubkey(&self) -> Option<PublicKey> {
        match self.pubkey_candidates.as_slice() {
            [pubkey] => Some(*pubkey),
            _ => None,
        }
    }

    pub fn has_pubkey(&self) -> bool {
        self.pubkey().is_some()
    }

    pub fn pubkey_candidates(&self) -> &[PublicKey] {
        &self.pubkey_candidates
    }

    /// Settle on `pubkey`.
    ///
    /// Refused when a settled key exists and `pubkey` is not among the
    /// candidates.
    pub fn set_pubkey(&mut self, pubkey: PublicKey) -> bool {
        if self.has_pubkey() && !self.pubkey_candidates.contains(&pubkey) {
            return false;
        }
        self.pubkey_candidates = vec![pubkey];
        true
    }

    /// Room tokens seen in join links, in discovery order.
    pub fn room_hints(&self) -> &[String] {
        &self.room_hints
    }

    /// Rooms fetched during resolution, before construction.
    pub fn fetched_rooms(&self) -> &[RoomRecord] {
        &self.fetched_rooms
    }

    pub fn set_fetched_rooms(&mut self, rooms: Vec<RoomRecord>) {
        self.fetched_rooms = rooms;
    }

    /// Constructed rooms; `None` until the candidate is resolved.
    pub fn rooms(&self) -> Option<&[RoomRecord]> {
        self.rooms.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.rooms.is_some()
    }

    /// Turn fetched rooms into the server's rooms.
    pub fn construct_rooms(&mut self) -> Result<()> {
        if !self.has_pubkey() {
            return Err(ServerError::UnresolvedPublicKey(self.base_url()));
        }
        self.rooms = Some(std::mem::take(&mut self.fetched_rooms));
        Ok(())
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub(crate) fn log_details(&self) {
        let pubkeys = self
            .pubkey_candidates
            .iter()
            .map(PublicKey::short)
            .collect::<Vec<_>>()
            .join(", ");
        debug!(
            "Server {}[{}/{}] {{ pubkey: [{pubkeys}] }}",
            self.base_url(),
            self.rooms.as_ref().map_or(0, Vec::len),
            self.room_hints.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "a03c383cf63c3c4efe67acc52112a6dd734b3a946b9545f488aaa93da7991238";
    const OTHER: &str = "b03c383cf63c3c4efe67acc52112a6dd734b3a946b9545f488aaa93da7991238";

    fn key(hex: &str) -> PublicKey {
        hex.parse().unwrap()
    }

    #[test]
    fn test_from_join_url() {
        let server =
            ServerCandidate::from_join_url(&format!("https://open.example.org/session?public_key={KEY}"))
                .unwrap();
        assert_eq!(server.base_url(), "https://open.example.org");
        assert_eq!(server.room_hints(), ["session"]);
        assert_eq!(server.pubkey(), Some(key(KEY)));
        assert!(!server.is_resolved());
    }

    #[test]
    fn test_hostname_and_urls() {
        let server = ServerCandidate::new("https://Chat.Example.org:8443").unwrap();
        assert_eq!(server.hostname(true), "chat.example.org:8443");
        assert_eq!(server.hostname(false), "chat.example.org");
        assert_eq!(server.rooms_api_url(), "https://chat.example.org:8443/rooms?all=1");
        assert_eq!(server.room_api_url("dev"), "https://chat.example.org:8443/room/dev");
        assert_eq!(server.preview_url("dev"), "https://chat.example.org:8443/r/dev");
        assert_eq!(server.join_url_fragment("dev"), "chat.example.org:8443/dev?public_key=");
        assert_eq!(server.join_url("dev"), None);
        assert!(!server.is_ip_host());
    }

    #[test]
    fn test_default_port_is_omitted() {
        let server = ServerCandidate::new("https://chat.example.org:443/").unwrap();
        assert_eq!(server.base_url(), "https://chat.example.org");
    }

    #[test]
    fn test_ip_hosts() {
        assert!(ServerCandidate::new("http://203.0.113.7:8080").unwrap().is_ip_host());
        assert!(ServerCandidate::new("http://[2001:db8::1]").unwrap().is_ip_host());
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        assert!(ServerCandidate::new("ftp://example.org").is_err());
        assert!(ServerCandidate::new("example.org").is_err());
    }

    #[test]
    fn test_downgrade_is_one_way() {
        let mut server = ServerCandidate::new("https://chat.example.org").unwrap();
        server.downgrade_scheme();
        assert_eq!(server.base_url(), "http://chat.example.org");
        server.downgrade_scheme();
        assert_eq!(server.scheme(), Scheme::Http);
    }

    #[test]
    fn test_set_pubkey() {
        let mut server = ServerCandidate::new("https://chat.example.org").unwrap();
        assert!(server.set_pubkey(key(KEY)));
        assert!(server.set_pubkey(key(KEY)));
        assert!(!server.set_pubkey(key(OTHER)));
        assert_eq!(server.pubkey(), Some(key(KEY)));

        // competing guesses: any of them may be confirmed
        server.pubkey_candidates.push(key(OTHER));
        assert_eq!(server.pubkey(), None);
        assert!(server.set_pubkey(key(OTHER)));
        assert_eq!(server.pubkey_candidates(), [key(OTHER)]);
    }

    #[test]
    fn test_construct_rooms_needs_pubkey() {
        let mut server = ServerCandidate::new("https://chat.example.org").unwrap();
        server.set_fetched_rooms(vec![RoomRecord::new("general")]);
        assert!(server.construct_rooms().is_err());

        server.set_pubkey(key(KEY));
        server.construct_rooms().unwrap();
        assert_eq!(server.rooms().map(<[_]>::len), Some(1));
        assert!(server.fetched_rooms().is_empty());
        assert_eq!(
            server.join_url("general").as_deref(),
            Some(format!("https://chat.example.org/general?public_key={KEY}").as_str())
        );
    }

    #[test]
    fn test_icon_url() {
        let server = ServerCandidate::new("https://chat.example.org").unwrap();
        let mut room = RoomRecord::new("general");
        assert_eq!(server.icon_url(&room), None);
        room.image_id = Some(12);
        assert_eq!(server.icon_url(&room).as_deref(), Some("https://chat.example.org/room/general/file/12"));
    }
}
