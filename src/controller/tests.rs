use super::{Collaborators, ControllerError, FlightController, SecurityContext};
use crate::autopilot::Autopilot;
use crate::collaborators::test_doubles::{
    FlakyPeers, Journal, RecordingAutopilot, RecordingFlightControl, RecordingPeriphery, ScriptedCredentials,
};
use crate::collaborators::{MissionStore, NavigationSystem, Peer};
use crate::envelope::{GeoPoint, MissionApproval, NoFlightArea};
use crate::message_link::{Delivery, LinkError, MessageLink, ServerReply, SimulatedLink, Topic};
use fixed::types::I32F32;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const BOARD: &str = "0a:1b:2c:3d:4e:5f";
const MISSION: &str = "$FlightMission H60.0_27.0_20.0&T1.0&W60.1_27.1_5.0&L60.0_27.0_0.0#";

struct Rig {
    link: Arc<SimulatedLink>,
    autopilot: Arc<RecordingAutopilot>,
    credentials: Arc<ScriptedCredentials>,
    periphery: Arc<RecordingPeriphery>,
    peers: Arc<FlakyPeers>,
    navigation: Arc<MissionStore>,
    journal: Journal,
    cancel: CancellationToken,
    controller: FlightController,
}

impl Rig {
    fn new(link: SimulatedLink) -> Self {
        let journal = Journal::default();
        let link = Arc::new(link);
        let autopilot = Arc::new(RecordingAutopilot { journal: journal.clone(), ..Default::default() });
        let credentials = Arc::new(ScriptedCredentials { journal: journal.clone(), ..Default::default() });
        let periphery = Arc::new(RecordingPeriphery { journal: journal.clone(), ..Default::default() });
        let peers = Arc::new(FlakyPeers { journal: journal.clone(), ..Default::default() });
        let navigation = Arc::new(MissionStore::default());
        let cancel = CancellationToken::new();
        let collaborators = Collaborators {
            credentials: Arc::clone(&credentials) as _,
            periphery: Arc::clone(&periphery) as _,
            navigation: Arc::clone(&navigation) as _,
            peers: Arc::clone(&peers) as _,
            flight_control: Arc::new(RecordingFlightControl { journal: journal.clone() }),
        };
        let ctx = SecurityContext::new(
            Arc::clone(&link) as Arc<dyn MessageLink>,
            Arc::clone(&autopilot) as Arc<dyn Autopilot>,
            collaborators,
            cancel.clone(),
        );
        let controller = FlightController::new(Arc::new(ctx));
        Self { link, autopilot, credentials, periphery, peers, navigation, journal, cancel, controller }
    }

    /// A link that only carries `MISSION`, everything else has to be injected.
    fn scripted() -> Self {
        let link = SimulatedLink::without_fixtures(Some(BOARD));
        link.set_fixture(Topic::FlightMission, MISSION, Delivery::Once, None);
        Self::new(link)
    }

    fn offline() -> Self { Self::new(SimulatedLink::new(Some(BOARD))) }

    fn start(&self) -> JoinHandle<Result<(), ControllerError>> {
        let controller = self.controller.clone();
        tokio::spawn(async move { controller.run().await })
    }

    fn arm_requests(&self) -> usize {
        self.link.publications().iter().filter(|(topic, _)| *topic == Topic::ArmRequest).count()
    }
}

/// Sleeps until `millis` after `start` on the paused clock.
async fn at(start: Instant, millis: u64) { tokio::time::sleep_until(start + Duration::from_millis(millis)).await; }

#[tokio::test(start_paused = true)]
async fn test_authentication_retries_until_success() {
    let rig = Rig::offline();
    rig.link.script_reply(Ok(ServerReply::Response(String::from("$#"))));
    rig.link.script_reply(Err(LinkError::NoConnection));
    let start = Instant::now();
    let handle = rig.start();

    at(start, 1500).await;
    assert_eq!(rig.link.request_count(), 2);
    assert!(rig.navigation.mission().is_none());

    at(start, 10_500).await;
    assert_eq!(rig.link.request_count(), 3);
    assert!(rig.link.requests()[2].starts_with(&format!("/api/auth?id={BOARD}&sig=0xabcd")));
    assert!(rig.navigation.mission().is_some_and(|m| m.len() == 15));
    rig.cancel.cancel();
    assert!(matches!(handle.await.unwrap(), Err(ControllerError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_never_end_authentication() {
    let rig = Rig::offline();
    for _ in 0..100 {
        rig.link.script_reply(Ok(ServerReply::Timeout));
    }
    let start = Instant::now();
    let handle = rig.start();

    at(start, 30_500).await;
    assert_eq!(rig.link.request_count(), 31);
    assert!(rig.navigation.mission().is_none());
    assert!(!handle.is_finished());
    rig.cancel.cancel();
    assert!(matches!(handle.await.unwrap(), Err(ControllerError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_unverified_success_is_retried() {
    let rig = Rig::offline();
    rig.credentials.reject_next(1);
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 2500).await;
    assert_eq!(rig.link.request_count(), 2);
    assert!(rig.navigation.mission().is_some());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_auth_answer_naming_the_board_is_accepted() {
    let rig = Rig::scripted();
    rig.link.script_reply(Ok(ServerReply::Response(format!("$Auth id={BOARD}#ff"))));
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert_eq!(rig.link.request_count(), 1);
    assert!(rig.navigation.mission().is_some());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_auth_answer_for_another_board_is_retried() {
    let rig = Rig::scripted();
    rig.link.script_reply(Ok(ServerReply::Response(String::from("$Auth id=ff:ff:ff:ff:ff:ff#ff"))));
    rig.link.script_reply(Ok(ServerReply::Response(format!("$Auth id={BOARD}#ff"))));
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert_eq!(rig.link.request_count(), 1);
    assert!(rig.navigation.mission().is_none());

    at(start, 1500).await;
    assert_eq!(rig.link.request_count(), 2);
    assert!(rig.navigation.mission().is_some());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_unverified_mission_is_dropped() {
    let rig = Rig::scripted();
    rig.credentials.verdicts.lock().unwrap().extend([true, false]);
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    assert!(rig.navigation.mission().is_none());
    assert_eq!(rig.journal.count(&format!("verify {MISSION}")), 1);
    rig.link.inject(Topic::FlightMission, MISSION);

    at(start, 2500).await;
    assert!(rig.navigation.mission().is_some_and(|m| m.len() == 4));
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_peers_are_awaited_in_order() {
    let rig = Rig::offline();
    rig.peers.failures.store(3, Ordering::Release);
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    assert_eq!(rig.journal.position("ready Logger"), None);
    assert_eq!(rig.link.request_count(), 0);

    at(start, 3500).await;
    let ready: Vec<String> = rig.journal.entries().into_iter().filter(|e| e.starts_with("ready ")).collect();
    let expected: Vec<String> = Peer::iter().map(|p| format!("ready {p}")).collect();
    assert_eq!(ready, expected);
    assert_eq!(rig.link.request_count(), 1);
    assert!(rig.journal.position("buzzer").is_some());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_broken_buzzer_is_not_fatal() {
    let rig = Rig::offline();
    rig.periphery.buzzer_broken.store(true, Ordering::Release);
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert_eq!(rig.link.request_count(), 1);
    assert!(rig.navigation.mission().is_some());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_grant_enables_kill_switch_before_permit() {
    let rig = Rig::scripted();
    rig.link.set_fixture(Topic::ArmResponse, "$Arm 0$Delay 3#", Delivery::Always, Some(Topic::ArmRequest));
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    let kill_switch = rig.journal.position("kill_switch true").unwrap();
    let permit = rig.journal.position("autopilot ArmPermit").unwrap();
    let handover = rig.journal.position("take_control").unwrap();
    assert!(kill_switch < permit);
    assert!(permit < handover);
    assert_eq!(rig.controller.context().session_delay().get(), 3);
    assert_eq!(rig.link.publications(), vec![(Topic::ArmRequest, String::from("sig=0xabcd"))]);
    assert!(rig.journal.position(&format!("sign /api/arm?id={BOARD}")).is_some());

    rig.link.inject(Topic::Ping, "$Delay 7#");
    at(start, 3500).await;
    assert_eq!(rig.controller.context().session_delay().get(), 7);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_kill_switch_is_retried_until_success() {
    let rig = Rig::offline();
    rig.periphery.kill_switch_failures.store(2, Ordering::Release);
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    assert_eq!(rig.journal.count("kill_switch true failed"), 2);
    assert_eq!(rig.journal.position("autopilot ArmPermit"), None);

    at(start, 2500).await;
    let kill_switch = rig.journal.position("kill_switch true").unwrap();
    assert!(kill_switch < rig.journal.position("autopilot ArmPermit").unwrap());
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_denial_then_grant() {
    let rig = Rig::scripted();
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 2500).await;
    assert_eq!(rig.arm_requests(), 1);
    rig.link.inject(Topic::ArmResponse, "$Arm 1$");

    at(start, 4500).await;
    assert_eq!(rig.journal.count("autopilot ArmForbid"), 1);
    assert_eq!(rig.journal.position("kill_switch true"), None);
    rig.autopilot.request_arm();

    at(start, 10_500).await;
    assert_eq!(rig.arm_requests(), 2);
    assert_eq!(rig.journal.position("autopilot ArmPermit"), None);
    rig.link.inject(Topic::ArmResponse, "$Arm 0$Delay 2#");

    at(start, 12_500).await;
    assert!(rig.journal.position("kill_switch true").is_some());
    assert_eq!(rig.journal.count("autopilot ArmPermit"), 1);
    assert_eq!(rig.controller.context().session_delay().get(), 2);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_stale_grant_after_denial_is_discarded() {
    let rig = Rig::scripted();
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 2500).await;
    rig.link.inject(Topic::ArmResponse, "$Arm 1$");

    at(start, 4500).await;
    assert_eq!(rig.journal.count("autopilot ArmForbid"), 1);
    rig.link.inject(Topic::ArmResponse, "$Arm 0$Delay 9#");
    rig.autopilot.request_arm();

    at(start, 10_500).await;
    assert_eq!(rig.arm_requests(), 2);
    assert_eq!(rig.journal.position("autopilot ArmPermit"), None);
    assert_eq!(rig.journal.position("kill_switch true"), None);
    assert_eq!(rig.controller.context().session_delay().get(), 1);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_unparsable_arm_response_is_a_silent_denial() {
    let rig = Rig::scripted();
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    rig.link.inject(Topic::ArmResponse, "$Arm 2$");

    at(start, 3500).await;
    assert_eq!(rig.journal.position("autopilot ArmForbid"), None);
    assert_eq!(rig.journal.position("kill_switch true"), None);
    assert_eq!(rig.journal.position("take_control"), None);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_zone_update_replaces_stored_set() {
    let rig = Rig::offline();
    let old = NoFlightArea::new(String::from("old"), vec![GeoPoint::new(I32F32::from_num(1), I32F32::from_num(2))]);
    rig.navigation.replace_no_flight_areas(vec![old]);
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    assert!(rig.journal.position("take_control").is_some());
    assert!(rig.navigation.no_flight_areas().is_empty());

    rig.link.inject(
        Topic::ForbiddenZones,
        "$ForbiddenZones 2&lake&3&60.0_27.0&60.1_27.0&60.1_27.1&field&3&59.5_26.5&59.6_26.5&59.6_26.6#",
    );
    at(start, 2500).await;
    let names: Vec<String> = rig.navigation.no_flight_areas().iter().map(|a| a.name().to_string()).collect();
    assert_eq!(names, vec![String::from("lake"), String::from("field")]);

    rig.link.inject(Topic::ForbiddenZones, "$ForbiddenZones 1&pond&3&60.0_27.0&60.1_27.0&60.1_27.1#");
    at(start, 3500).await;
    assert_eq!(rig.navigation.no_flight_areas().len(), 1);
    assert_eq!(rig.navigation.no_flight_areas()[0].name(), "pond");
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_emergency_stop_disables_kill_switch() {
    let rig = Rig::offline();
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert_eq!(rig.journal.count("buzzer"), 1);
    rig.periphery.kill_switch_failures.store(2, Ordering::Release);
    rig.link.inject(Topic::FlightStatus, "$Flight -1$");

    at(start, 4500).await;
    assert_eq!(rig.journal.count("buzzer"), 2);
    assert_eq!(rig.journal.count("kill_switch false failed"), 2);
    assert_eq!(rig.journal.count("kill_switch false"), 1);
    rig.cancel.cancel();
}

/// A scripted rig that is armed right after start.
fn armed_rig() -> Rig {
    let rig = Rig::scripted();
    rig.link.set_fixture(Topic::ArmResponse, "$Arm 0$Delay 1#", Delivery::Always, Some(Topic::ArmRequest));
    rig.autopilot.request_arm();
    rig
}

#[tokio::test(start_paused = true)]
async fn test_unverified_zones_keep_the_stored_set() {
    let rig = armed_rig();
    let old = NoFlightArea::new(String::from("old"), vec![GeoPoint::new(I32F32::from_num(1), I32F32::from_num(2))]);
    rig.navigation.replace_no_flight_areas(vec![old]);
    let zones = "$ForbiddenZones 1&pond&3&60.0_27.0&60.1_27.0&60.1_27.1#";
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert!(rig.journal.position("take_control").is_some());
    rig.credentials.reject_next(1);
    rig.link.inject(Topic::ForbiddenZones, zones);

    at(start, 1500).await;
    assert_eq!(rig.navigation.no_flight_areas().len(), 1);
    assert_eq!(rig.navigation.no_flight_areas()[0].name(), "old");
    rig.link.inject(Topic::ForbiddenZones, zones);

    at(start, 2500).await;
    assert_eq!(rig.navigation.no_flight_areas()[0].name(), "pond");
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_unverified_emergency_stop_is_ignored() {
    let rig = armed_rig();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    assert!(rig.journal.position("kill_switch true").is_some());
    rig.credentials.reject_next(1);
    rig.link.inject(Topic::FlightStatus, "$Flight -1$");

    at(start, 1500).await;
    assert_eq!(rig.journal.position("kill_switch false"), None);
    assert_eq!(rig.journal.count("buzzer"), 1);
    rig.link.inject(Topic::FlightStatus, "$Flight -1$");

    at(start, 2500).await;
    assert_eq!(rig.journal.count("kill_switch false"), 1);
    assert_eq!(rig.journal.count("buzzer"), 2);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_pause_status_is_ignored() {
    let rig = Rig::offline();
    rig.autopilot.request_arm();
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 500).await;
    rig.link.inject(Topic::FlightStatus, "$Flight 1#");
    at(start, 2500).await;
    assert_eq!(rig.journal.count("buzzer"), 1);
    assert_eq!(rig.journal.position("kill_switch false"), None);
    rig.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_mission_approval() {
    let rig = Rig::offline();
    assert!(matches!(
        rig.controller.request_mission_approval("m1").await,
        Err(ControllerError::NotIdentified)
    ));
    let start = Instant::now();
    let _handle = rig.start();

    at(start, 1500).await;
    assert_eq!(rig.controller.request_mission_approval("m1").await.unwrap(), MissionApproval::Approved);
    assert!(rig.link.publications().contains(&(Topic::MissionRequest, String::from("mission=m1&sig=0xabcd"))));
    assert!(rig.journal.position(&format!("sign /api/nmission?id={BOARD}&mission=m1")).is_some());

    rig.link.set_fixture(Topic::MissionResponse, "$Approve 1#", Delivery::Always, None);
    assert_eq!(rig.controller.request_mission_approval("m2").await.unwrap(), MissionApproval::Rejected);

    rig.credentials.reject_next(1);
    assert!(matches!(
        rig.controller.request_mission_approval("m3").await,
        Err(ControllerError::Unverified)
    ));

    rig.link.set_fixture(Topic::MissionResponse, "$Arm 1$", Delivery::Always, None);
    assert!(matches!(
        rig.controller.request_mission_approval("m4").await,
        Err(ControllerError::Unexpected(_))
    ));
    rig.cancel.cancel();
}
