use super::{LinkError, ServerReply};
use std::time::Duration;

/// A thin wrapper around `reqwest::Client` for the one-shot `GET` requests
/// sent to the ATM server.
///
/// Connection pooling is disabled, so every request opens and closes its own
/// connection. A single bounded wait covers connect and response.
#[derive(Debug)]
pub(crate) struct HTTPClient {
    /// The underlying `reqwest::Client` used to perform HTTP requests.
    client: reqwest::Client,
    /// Base URL of the server, prepended to every query.
    base_url: String,
}

impl HTTPClient {
    /// Fixed connect/response wait of the ATM server.
    pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
    /// Upper bound for the accumulated response content in bytes.
    pub(crate) const CONTENT_SIZE: usize = 4096;

    /// Constructs a new `HTTPClient` with the given base URL and wait bound.
    ///
    /// # Arguments
    /// * `base_url` – The root URL, e.g. `"http://192.168.1.2:8080"`.
    /// * `timeout` – Bound for connecting and receiving the full response.
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<HTTPClient, LinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(HTTPClient { client, base_url: String::from(base_url.trim_end_matches('/')) })
    }

    /// Returns the base URL that the client was initialized with.
    pub(crate) fn url(&self) -> &str { self.base_url.as_str() }

    /// Sends `query` as a `GET` request and returns the envelope in the reply.
    ///
    /// Running into the wait bound yields `Ok(ServerReply::Timeout)`; every
    /// other problem, including oversized content or a reply without any `$`,
    /// is an error.
    pub(crate) async fn get_envelope(&self, query: &str) -> Result<ServerReply, LinkError> {
        let url = format!("{}{query}", self.base_url);
        let mut response = match self
            .client
            .get(url)
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(ServerReply::Timeout),
            Err(e) => return Err(e.into()),
        };

        let mut content = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if content.len() + chunk.len() >= Self::CONTENT_SIZE {
                        return Err(LinkError::ContentTooLarge(content.len() + chunk.len()));
                    }
                    content.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) if e.is_timeout() => return Ok(ServerReply::Timeout),
                Err(e) => return Err(e.into()),
            }
        }
        extract_envelope(&String::from_utf8_lossy(&content))
    }
}

/// Cuts the reply content at the first envelope start marker.
pub(crate) fn extract_envelope(content: &str) -> Result<ServerReply, LinkError> {
    content
        .find('$')
        .map(|start| ServerReply::Response(content[start..].trim_end().to_string()))
        .ok_or(LinkError::MissingEnvelope)
}
