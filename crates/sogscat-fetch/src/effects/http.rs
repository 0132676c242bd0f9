use std::future::Future;

use crate::data::{Request, Response};
use crate::error::HttpError;

/// Asynchronous HTTP client abstraction.
///
/// Implementations follow redirects and enforce their own connect and total
/// deadlines. A completed exchange is `Ok` whatever its status; only
/// transport failures are errors.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - [`MockClient`](crate::MockClient): Scripted responses for tests
pub trait HttpClient: Send + Sync {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = std::result::Result<Response, HttpError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use crate::data::{Method, Timeouts};
    use crate::error::{FetchError, Result};

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(timeouts: Timeouts) -> Result<Self> {
            let client = reqwest::Client::builder()
                .connect_timeout(timeouts.connect)
                .timeout(timeouts.total)
                .user_agent(concat!("sogscat/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| FetchError::Client(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        async fn execute(&self, request: Request) -> std::result::Result<Response, HttpError> {
            let method = match request.method() {
                Method::Get => reqwest::Method::GET,
                Method::Head => reqwest::Method::HEAD,
            };
            let mut builder = self.client.request(method, request.url().clone());
            if let Some(timeout) = request.options().timeout {
                builder = builder.timeout(timeout);
            }
            for (key, value) in request.options().headers.iter() {
                builder = builder.header(key, value);
            }

            let response = builder.send().await?;
            let effective_url = response.url().clone();
            let status = response.status().as_u16();
            let body = response.bytes().await?;

            Ok(Response::new(effective_url, status, body))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
