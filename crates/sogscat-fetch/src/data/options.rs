use std::time::Duration;
use std::sync::Arc;

/// Connection and transfer deadlines of the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time to establish a connection.
    pub connect: Duration,
    /// Maximum time for one whole exchange, transfer included.
    pub total: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(2000),
            total: Duration::from_millis(9000),
        }
    }
}

impl Timeouts {
    /// Shorter deadlines for fast runs.
    pub fn fast() -> Self {
        Self {
            total: Duration::from_millis(3000),
            ..Self::default()
        }
    }

    /// Pick [`Timeouts::fast`] or the defaults.
    pub fn for_mode(fast: bool) -> Self {
        if fast { Self::fast() } else { Self::default() }
    }
}

/// Per-request options.
///
/// # Examples
///
/// ```
/// use sogscat_fetch::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::default()
///     .timeout(Duration::from_secs(3))
///     .header("User-Agent", "sogscat");
/// assert_eq!(options.headers.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Overrides the client's total deadline for this request.
    ///
    /// Default: None
    pub timeout: Option<Duration>,

    /// Extra HTTP headers, sent with every attempt of the request.
    ///
    /// Default: empty
    pub headers: Arc<[(String, String)]>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            headers: Arc::new([]),
        }
    }
}

impl RequestOptions {
    /// Set a per-request deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a single HTTP header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = headers.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.connect, Duration::from_millis(2000));
        assert_eq!(timeouts.total, Duration::from_millis(9000));
    }

    #[test]
    fn test_fast_timeouts_keep_connect_deadline() {
        let timeouts = Timeouts::for_mode(true);
        assert_eq!(timeouts.connect, Duration::from_millis(2000));
        assert_eq!(timeouts.total, Duration::from_millis(3000));
        assert_eq!(Timeouts::for_mode(false), Timeouts::default());
    }

    #[test]
    fn test_headers_accumulate() {
        let options = RequestOptions::default()
            .header("Accept", "application/json")
            .header("User-Agent", "sogscat");
        assert_eq!(options.headers.len(), 2);
        assert_eq!(options.headers[0].0, "Accept");
        assert!(options.timeout.is_none());
    }
}
