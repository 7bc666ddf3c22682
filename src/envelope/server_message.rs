use super::{EnvelopeError, MissionDocument, NoFlightArea, zones::parse_zones};
use regex::Regex;
use std::sync::LazyLock;
use strum_macros::Display;

/// Extracts the tag directly following the leading `$`.
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$([A-Za-z]*)").unwrap());

/// Extracts the session delay in seconds from a `$Delay N` field anywhere in the body.
static DELAY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$Delay (\d+)").unwrap());

/// Outcome of an arm request as decided by the ATM server.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ArmDecision {
    /// `$Arm 0$`, optionally carrying the first session delay.
    Granted { delay: Option<u32> },
    /// `$Arm 1$`
    Denied,
}

/// Flight status pushed by the ATM server.
///
/// The three markers are matched literally: `$Flight 0#`, `$Flight 1#` and
/// `$Flight -1$`. The emergency stop uses `$` as its terminator.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Resume,
    Pause,
    EmergencyStop,
}

/// Server verdict on a newly submitted mission. `0` approves, `1` rejects.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum MissionApproval {
    Approved,
    Rejected,
}

/// Every envelope kind the security module understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Success,
    /// `$Auth id=<board>#`, the live server's authentication answer.
    Auth { id: String },
    Failure,
    Delay(u32),
    Arm(ArmDecision),
    Flight(FlightStatus),
    ForbiddenZones(Vec<NoFlightArea>),
    FlightMission(MissionDocument),
    Approve(MissionApproval),
}

impl ServerMessage {
    /// Splits a received envelope into its body and the out-of-band signature.
    ///
    /// The body keeps its terminating `#`; the signature is whatever follows
    /// the last `#`. Envelopes without any `#` have no signature part.
    pub fn split_signature(raw: &str) -> (&str, Option<&str>) {
        match raw.rfind('#') {
            Some(idx) => (&raw[..=idx], Some(&raw[idx + 1..])),
            None => (raw, None),
        }
    }

    /// Parses a raw envelope into a typed message.
    ///
    /// # Errors
    /// * `Empty` – nothing but whitespace or NUL bytes was received.
    /// * `MissingStart` – the body does not begin with `$`.
    /// * `UnknownTag` – the tag is not part of the wire grammar.
    /// * `Unrecognized` – the tag is known but no expected marker matched.
    /// * `Malformed` – a structured body (zones, mission, delay) failed to parse.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if trimmed.is_empty() {
            return Err(EnvelopeError::Empty);
        }
        let (body, _) = Self::split_signature(trimmed);
        let tag = TAG_REGEX
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or(EnvelopeError::MissingStart)?;

        match tag {
            "" if body.starts_with("$#") => Ok(ServerMessage::Failure),
            "Success" if body.starts_with("$Success#") => Ok(ServerMessage::Success),
            "Auth" => {
                let id = strip_section(body, "$Auth id=")?;
                if id.is_empty() {
                    return Err(EnvelopeError::Malformed);
                }
                Ok(ServerMessage::Auth { id: id.to_string() })
            }
            "Delay" => parse_delay(body)
                .map(ServerMessage::Delay)
                .ok_or(EnvelopeError::Malformed),
            "Arm" => {
                if body.contains("$Arm 0$") {
                    Ok(ServerMessage::Arm(ArmDecision::Granted { delay: parse_delay(body) }))
                } else if body.contains("$Arm 1$") {
                    Ok(ServerMessage::Arm(ArmDecision::Denied))
                } else {
                    Err(EnvelopeError::Unrecognized)
                }
            }
            "Flight" => {
                if body.starts_with("$Flight -1$") {
                    Ok(ServerMessage::Flight(FlightStatus::EmergencyStop))
                } else if body.starts_with("$Flight 0#") {
                    Ok(ServerMessage::Flight(FlightStatus::Resume))
                } else if body.starts_with("$Flight 1#") {
                    Ok(ServerMessage::Flight(FlightStatus::Pause))
                } else {
                    Err(EnvelopeError::Unrecognized)
                }
            }
            "ForbiddenZones" => {
                let content = strip_section(body, "$ForbiddenZones ")?;
                Ok(ServerMessage::ForbiddenZones(parse_zones(content)?))
            }
            "FlightMission" => {
                let content = strip_section(body, "$FlightMission ")?;
                Ok(ServerMessage::FlightMission(MissionDocument::parse(content)?))
            }
            "Approve" => {
                if body.starts_with("$Approve 0#") {
                    Ok(ServerMessage::Approve(MissionApproval::Approved))
                } else if body.starts_with("$Approve 1#") {
                    Ok(ServerMessage::Approve(MissionApproval::Rejected))
                } else {
                    Err(EnvelopeError::Unrecognized)
                }
            }
            "" | "Success" => Err(EnvelopeError::Unrecognized),
            other => Err(EnvelopeError::UnknownTag(other.to_string())),
        }
    }
}

/// Reads the first `$Delay N` field of an envelope body.
pub fn parse_delay(body: &str) -> Option<u32> {
    DELAY_REGEX.captures(body).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Returns the content between a section prefix and the `#` terminator.
fn strip_section<'a>(body: &'a str, prefix: &str) -> Result<&'a str, EnvelopeError> {
    let content = body.strip_prefix(prefix).ok_or(EnvelopeError::Malformed)?;
    content.strip_suffix('#').ok_or(EnvelopeError::Unterminated)
}
