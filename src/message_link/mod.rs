//! Publish/subscribe plus request/response access to the ATM server.
//!
//! Two interchangeable backends implement [`MessageLink`]:
//! [`SimulatedLink`] plays back deterministic fixtures, [`NetworkLink`] talks
//! to the real MQTT broker and HTTP endpoint.

mod board_identity;
mod http_client;
mod link_error;
mod mailbox;
mod network_link;
mod simulated_link;
mod topic;

pub use link_error::LinkError;
pub use mailbox::Mailbox;
pub use network_link::NetworkLink;
pub use simulated_link::{Delivery, SimulatedLink};
pub use topic::Topic;

use async_trait::async_trait;

/// Reply of a synchronous server request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    /// The raw envelope, starting at its first `$`.
    Response(String),
    /// The server did not answer within the bounded wait. Retryable.
    Timeout,
}

/// Minimal transport contract the flight controller runs over.
///
/// Subscriptions are read through a depth-1 mailbox per topic: a newer
/// publication overwrites an unread older one. Reading never blocks, callers
/// that need to wait poll and sleep themselves.
#[async_trait]
pub trait MessageLink: Send + Sync {
    /// Establishes the board identity and any transport connections.
    ///
    /// Failures are reported, never retried internally.
    async fn init(&self) -> Result<(), LinkError>;

    /// The board identity, once `init` succeeded.
    fn board_id(&self) -> Option<String>;

    /// Publishes `payload` on the board-scoped address of `topic`.
    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), LinkError>;

    /// Takes the pending publication of `topic`, if any.
    fn receive(&self, topic: Topic) -> Option<String>;

    /// Sends `query` to the server and waits a bounded time for the reply.
    async fn request(&self, query: &str) -> Result<ServerReply, LinkError>;
}
