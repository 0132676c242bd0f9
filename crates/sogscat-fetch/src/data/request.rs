use std::borrow::Cow;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use super::options::RequestOptions;
use crate::error::{FetchError, Result};

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    /// Headers only; used for reachability probes.
    Head,
}

/// A single HTTP exchange to perform.
///
/// Requests are plain values. Policies that repeat an exchange issue a fresh
/// clone for every attempt rather than reusing one handed to a client.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    options: RequestOptions,
}

impl Request {
    /// Build a request, rejecting unparsable URLs and non-HTTP schemes.
    pub fn new(method: Method, url: &str, options: RequestOptions) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self {
                method,
                url,
                options,
            }),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn get(url: &str, options: RequestOptions) -> Result<Self> {
        Self::new(Method::Get, url, options)
    }

    pub fn head(url: &str, options: RequestOptions) -> Result<Self> {
        Self::new(Method::Head, url, options)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Same method and options, different target.
    pub fn retarget(&self, url: Url) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    /// Plain-HTTP copy of a secure request.
    ///
    /// Returns `None` when the request is not HTTPS.
    pub fn downgraded(&self) -> Option<Self> {
        if !self.is_secure() {
            return None;
        }
        let mut url = self.url.clone();
        url.set_scheme("http").ok()?;
        Some(self.retarget(url))
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct Response {
    effective_url: Url,
    status: u16,
    body: Bytes,
}

impl Response {
    pub fn new(effective_url: Url, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            effective_url,
            status,
            body: body.into(),
        }
    }

    /// URL the response was served from, after redirects.
    pub fn effective_url(&self) -> &Url {
        &self.effective_url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_schemes() {
        let err = Request::get("ftp://example.com/file", RequestOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(s) if s == "ftp"));

        let err = Request::get("not a url", RequestOptions::default()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_downgrade_keeps_host_path_and_port() {
        let request = Request::get("https://example.com:8443/rooms?all=1", RequestOptions::default())
            .unwrap();
        let plain = request.downgraded().unwrap();
        assert_eq!(plain.url().as_str(), "http://example.com:8443/rooms?all=1");
        assert_eq!(plain.method(), Method::Get);
        assert!(!plain.is_secure());
        assert!(plain.downgraded().is_none());
    }

    #[test]
    fn test_response_success_range() {
        let url = Url::parse("http://example.com/").unwrap();
        assert!(Response::new(url.clone(), 200, "").is_success());
        assert!(Response::new(url.clone(), 204, "").is_success());
        assert!(!Response::new(url.clone(), 301, "").is_success());
        assert!(!Response::new(url, 500, "").is_success());
    }

    #[test]
    fn test_response_json() {
        let url = Url::parse("http://example.com/").unwrap();
        let response = Response::new(url.clone(), 200, r#"{"token":"general"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["token"], "general");

        let broken = Response::new(url, 200, "<html>");
        assert!(broken.json::<serde_json::Value>().is_err());
    }
}
