use strum_macros::Display;

/// Transport level failures of a [`super::MessageLink`].
///
/// A server timeout is not part of this enum: it is reported as
/// [`super::ServerReply::Timeout`] because callers retry it with backoff.
#[derive(Debug, Display)]
pub enum LinkError {
    /// `init` has not completed yet.
    NotInitialized,
    /// No board identity could be determined.
    NoIdentity,
    /// Connecting to the server or broker failed.
    NoConnection,
    /// The response body exceeded the content bound.
    ContentTooLarge(usize),
    /// The response body contained no `$` envelope start.
    MissingEnvelope,
    /// The broker client rejected the request.
    Broker(String),
    Unknown,
}

impl std::error::Error for LinkError {}

impl From<reqwest::Error> for LinkError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_connect() {
            LinkError::NoConnection
        } else {
            LinkError::Unknown
        }
    }
}

impl From<rumqttc::ClientError> for LinkError {
    fn from(value: rumqttc::ClientError) -> Self { LinkError::Broker(value.to_string()) }
}
