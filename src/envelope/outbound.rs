//! Builders for the textual queries and publications sent to the ATM server.
//!
//! The message that gets signed always names the board, while the published
//! payload only carries the signature: the board is already part of the
//! topic the payload is published on.

/// Signed part of the authentication request.
pub fn auth_query(board_id: &str) -> String { format!("/api/auth?id={board_id}") }

/// Signed part of the arm request.
pub fn arm_query(board_id: &str) -> String { format!("/api/arm?id={board_id}") }

/// Signed part of a new-mission approval request.
pub fn mission_query(board_id: &str, mission: &str) -> String {
    format!("/api/nmission?id={board_id}&mission={mission}")
}

/// Appends the hex signature to an HTTP query.
pub fn signed_query(query: &str, signature: &str) -> String { format!("{query}&sig=0x{signature}") }

/// Payload published on `api/arm/request`.
pub fn arm_publication(signature: &str) -> String { format!("sig=0x{signature}") }

/// Payload published on `api/nmission/request`.
pub fn mission_publication(mission: &str, signature: &str) -> String {
    format!("mission={mission}&sig=0x{signature}")
}

/// Payload published on `api/events` for a decoded autopilot event.
pub fn event_publication(kind: &str, event: &str) -> String { format!("type={kind}&event={event}") }
