use super::{LinkError, Mailbox, MessageLink, ServerReply, Topic};
use crate::info;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// How often a scripted fixture is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered on the first poll only.
    Once,
    /// Delivered on every poll.
    Always,
}

#[derive(Debug, Clone)]
struct Fixture {
    payload: String,
    delivery: Delivery,
    /// Topic that has to be published on before the fixture is delivered.
    gate: Option<Topic>,
    sent: bool,
}

/// Deterministic stand-in for the ATM server.
///
/// Subscriptions are answered from per-topic fixtures, publications only
/// unlock gated fixtures and are recorded, and requests receive canned
/// envelopes. Payloads injected through [`SimulatedLink::inject`] go through
/// the same depth-1 mailbox the network backend uses and take precedence over
/// fixtures.
#[derive(Debug)]
pub struct SimulatedLink {
    configured_id: String,
    board_id: OnceLock<String>,
    mailbox: Mailbox,
    fixtures: Mutex<HashMap<Topic, Fixture>>,
    opened_gates: Mutex<HashSet<Topic>>,
    publications: Mutex<Vec<(Topic, String)>>,
    scripted_replies: Mutex<VecDeque<Result<ServerReply, LinkError>>>,
    requests: Mutex<Vec<String>>,
}

/// Mission handed out by the offline fixture set.
pub const OFFLINE_MISSION: &str = "$FlightMission H60.0144850_27.8200870_20.00&T1.0&W60.0144222_27.8200360_1.0&W60.0144105_27.8201212_1.0&W60.0144478_27.8201520_1.0&W60.0144280_27.8202989_1.0&W60.0143923_27.8202660_1.0&W60.0143809_27.8203599_1.0&W60.0144471_27.8204216_1.0&D3.0&S5.0_1200.0&D1.0&S5.0_1800.0&W60.0144756_27.8201668_1.0&L60.0144756_27.8201668_0.0#";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> { mutex.lock().unwrap_or_else(PoisonError::into_inner) }

impl SimulatedLink {
    /// Identity used when no board identity is configured.
    pub const DEF_BOARD_ID: &'static str = "00:00:00:00:00:00";

    /// Creates a link loaded with the offline fixture set.
    pub fn new(board_id: Option<&str>) -> Self {
        let link = Self::without_fixtures(board_id);
        link.set_fixture(Topic::Ping, "$Delay 1#", Delivery::Always, None);
        link.set_fixture(Topic::FlightStatus, "$Flight 0#", Delivery::Once, None);
        link.set_fixture(Topic::FlightMission, OFFLINE_MISSION, Delivery::Once, None);
        link.set_fixture(Topic::ForbiddenZones, "$ForbiddenZones 0#", Delivery::Once, None);
        link.set_fixture(Topic::ArmResponse, "$Arm 0$Delay 1#", Delivery::Always, Some(Topic::ArmRequest));
        link.set_fixture(
            Topic::MissionResponse,
            "$Approve 0#",
            Delivery::Always,
            Some(Topic::MissionRequest),
        );
        link
    }

    /// Creates a link that never delivers anything unless scripted.
    pub fn without_fixtures(board_id: Option<&str>) -> Self {
        Self {
            configured_id: board_id.unwrap_or(Self::DEF_BOARD_ID).to_string(),
            board_id: OnceLock::new(),
            mailbox: Mailbox::new(),
            fixtures: Mutex::new(HashMap::new()),
            opened_gates: Mutex::new(HashSet::new()),
            publications: Mutex::new(Vec::new()),
            scripted_replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Installs or replaces the fixture of `topic`.
    ///
    /// # Arguments
    /// * `gate` – If set, the fixture stays silent until something was published on this topic.
    pub fn set_fixture(&self, topic: Topic, payload: &str, delivery: Delivery, gate: Option<Topic>) {
        lock(&self.fixtures).insert(
            topic,
            Fixture { payload: payload.to_string(), delivery, gate, sent: false },
        );
    }

    /// Pushes a publication into the mailbox as if the broker had delivered it.
    pub fn inject(&self, topic: Topic, payload: &str) { self.mailbox.store(topic, payload.to_string()); }

    /// Queues the reply returned by the next `request` call.
    pub fn script_reply(&self, reply: Result<ServerReply, LinkError>) {
        lock(&self.scripted_replies).push_back(reply);
    }

    /// Every `(topic, payload)` published so far, in order.
    pub fn publications(&self) -> Vec<(Topic, String)> { lock(&self.publications).clone() }

    /// Every query sent through `request` so far, in order.
    pub fn requests(&self) -> Vec<String> { lock(&self.requests).clone() }

    pub fn request_count(&self) -> usize { lock(&self.requests).len() }

    fn canned_reply(query: &str) -> ServerReply {
        if query.contains("/api/auth?") {
            ServerReply::Response(String::from("$Success#"))
        } else {
            ServerReply::Response(String::from("$#"))
        }
    }
}

#[async_trait]
impl MessageLink for SimulatedLink {
    async fn init(&self) -> Result<(), LinkError> {
        if self.configured_id.is_empty() {
            return Err(LinkError::NoIdentity);
        }
        if self.board_id.set(self.configured_id.clone()).is_ok() {
            info!("Simulated link initialized as board '{}'", self.configured_id);
        }
        Ok(())
    }

    fn board_id(&self) -> Option<String> { self.board_id.get().cloned() }

    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), LinkError> {
        if self.board_id.get().is_none() {
            return Err(LinkError::NotInitialized);
        }
        lock(&self.opened_gates).insert(topic);
        lock(&self.publications).push((topic, payload.to_string()));
        Ok(())
    }

    fn receive(&self, topic: Topic) -> Option<String> {
        if let Some(payload) = self.mailbox.take(topic) {
            return Some(payload);
        }
        let mut fixtures = lock(&self.fixtures);
        let fixture = fixtures.get_mut(&topic)?;
        if fixture.gate.is_some_and(|gate| !lock(&self.opened_gates).contains(&gate)) {
            return None;
        }
        if fixture.delivery == Delivery::Once && fixture.sent {
            return None;
        }
        fixture.sent = true;
        Some(fixture.payload.clone())
    }

    async fn request(&self, query: &str) -> Result<ServerReply, LinkError> {
        lock(&self.requests).push(query.to_string());
        let scripted = lock(&self.scripted_replies).pop_front();
        scripted.unwrap_or_else(|| Ok(Self::canned_reply(query)))
    }
}
