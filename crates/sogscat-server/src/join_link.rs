//! Community join links: `https://host/token?public_key=<64 hex digits>`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::{Result, ServerError};

static JOIN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^/\s"'<>]+/[0-9a-z_-]+\?public_key=[0-9a-f]{64}"#).unwrap()
});

/// A server's 32-byte public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four hex digits, for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..2])
    }
}

impl FromStr for PublicKey {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| ServerError::InvalidPublicKey(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A parsed join link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLink {
    base_url: String,
    token: String,
    pubkey: PublicKey,
}

impl JoinLink {
    pub fn parse(link: &str) -> Result<Self> {
        let url = Url::parse(link).map_err(|e| ServerError::InvalidUrl {
            url: link.to_string(),
            reason: e.to_string(),
        })?;
        let base_url = base_url_of(&url).ok_or_else(|| ServerError::InvalidUrl {
            url: link.to_string(),
            reason: "missing host".to_string(),
        })?;
        let token = url.path().replace('/', "");
        let pubkey = url
            .query_pairs()
            .find(|(key, _)| key == "public_key")
            .ok_or_else(|| ServerError::MissingPublicKey(link.to_string()))?
            .1
            .parse()?;
        Ok(Self {
            base_url,
            token,
            pubkey,
        })
    }

    /// `scheme://host[:port]` of the server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn pubkey(&self) -> PublicKey {
        self.pubkey
    }
}

/// All join links in `text`, sorted and without duplicates.
pub fn parse_join_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = JOIN_LINK
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    links.sort();
    links.dedup();
    links
}

/// `scheme://host[:port]` of `url`.
pub fn base_url_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}
