use async_trait::async_trait;
use hashmirror_core::MirrorError;
use log::debug;
use std::time::Duration;

/// GET-by-URL, the only thing the fetcher needs from the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Full response body of a successful GET.
    ///
    /// Transport failures map to [`MirrorError::Network`], non-2xx answers
    /// to [`MirrorError::HttpStatus`].
    async fn get(&self, url: &str) -> Result<Vec<u8>, MirrorError>;
}

/// `surf`-backed transport that follows release-download redirects.
pub struct HttpTransport {
    client: surf::Client,
    timeout: Duration,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: surf::Client::new().with(RedirectMiddleware::new(5)),
            timeout,
            user_agent: format!("hashmirror/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, MirrorError> {
        let network = |reason: String| MirrorError::Network {
            url: url.to_string(),
            reason,
        };

        debug!("GET {}", url);
        let request = async {
            let mut response = self
                .client
                .get(url)
                .header("User-Agent", self.user_agent.as_str())
                .await
                .map_err(|e| network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(MirrorError::HttpStatus {
                    url: url.to_string(),
                    status: u16::from(status),
                });
            }

            response
                .body_bytes()
                .await
                .map_err(|e| network(format!("reading body: {}", e)))
        };

        async_std::future::timeout(self.timeout, request)
            .await
            .map_err(|_| network(format!("timed out after {:?}", self.timeout)))?
    }
}

struct RedirectMiddleware {
    max_attempts: u8,
}

impl RedirectMiddleware {
    pub fn new(max_attempts: u8) -> Self {
        Self { max_attempts }
    }
}

#[surf::utils::async_trait]
impl surf::middleware::Middleware for RedirectMiddleware {
    async fn handle(
        &self,
        req: surf::Request,
        client: surf::Client,
        next: surf::middleware::Next<'_>,
    ) -> surf::Result<surf::Response> {
        let mut attempts = 0;
        let mut current_req = req;

        loop {
            if attempts > self.max_attempts {
                return Err(surf::Error::from_str(
                    surf::StatusCode::LoopDetected,
                    "Too many redirects",
                ));
            }

            let response = next.run(current_req.clone(), client.clone()).await?;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response.header("Location") else {
                return Ok(response);
            };

            // GitHub answers `latest/download/...` with an absolute URL, but
            // mirrors are free to redirect relatively.
            let loc_str = location.last().as_str();
            let new_url = match surf::Url::parse(loc_str) {
                Ok(u) => u,
                Err(_) => current_req.url().join(loc_str).map_err(|_| {
                    surf::Error::from_str(surf::StatusCode::BadGateway, "Invalid redirect location")
                })?,
            };
            debug!("redirect {} -> {}", current_req.url(), new_url);

            let mut redirected = surf::Request::new(current_req.method(), new_url);
            if let Some(agent) = current_req.header("User-Agent") {
                redirected.insert_header("User-Agent", agent.last().as_str());
            }
            current_req = redirected;
            attempts += 1;
        }
    }
}
