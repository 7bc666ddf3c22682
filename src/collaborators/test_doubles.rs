//! Recording collaborators with failure injection, shared by the controller tests.

use super::{CollaboratorError, CredentialManager, FlightControl, Peer, PeerRegistry, PeripheryController};
use crate::autopilot::{Autopilot, AutopilotCommand, CommandPayload, FrameError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Ordered log of collaborator calls across all doubles of one test.
#[derive(Debug, Default, Clone)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) { self.0.lock().unwrap().push(entry.into()); }
    pub fn entries(&self) -> Vec<String> { self.0.lock().unwrap().clone() }
    pub fn count(&self, entry: &str) -> usize { self.entries().iter().filter(|e| *e == entry).count() }
    pub fn position(&self, entry: &str) -> Option<usize> { self.entries().iter().position(|e| e == entry) }
}

/// Decrements `counter` if positive, telling whether a failure was still pending.
fn consume_failure(counter: &AtomicUsize) -> bool {
    counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)).is_ok()
}

#[derive(Debug, Default)]
pub struct ScriptedCredentials {
    pub journal: Journal,
    pub sign_failures: AtomicUsize,
    /// Verdicts handed out by `check_signature` before falling back to `true`.
    pub verdicts: Mutex<VecDeque<bool>>,
}

impl ScriptedCredentials {
    pub fn reject_next(&self, count: usize) { self.verdicts.lock().unwrap().extend(std::iter::repeat_n(false, count)); }
}

#[async_trait]
impl CredentialManager for ScriptedCredentials {
    async fn sign_message(&self, message: &str) -> Result<String, CollaboratorError> {
        if consume_failure(&self.sign_failures) {
            return Err(CollaboratorError::SigningFailed);
        }
        self.journal.record(format!("sign {message}"));
        Ok(String::from("abcd"))
    }

    async fn check_signature(&self, envelope: &str) -> Result<bool, CollaboratorError> {
        self.journal.record(format!("verify {envelope}"));
        Ok(self.verdicts.lock().unwrap().pop_front().unwrap_or(true))
    }
}

#[derive(Debug, Default)]
pub struct RecordingPeriphery {
    pub journal: Journal,
    pub kill_switch_failures: AtomicUsize,
    pub buzzer_broken: AtomicBool,
}

#[async_trait]
impl PeripheryController for RecordingPeriphery {
    async fn set_kill_switch(&self, enable: bool) -> Result<(), CollaboratorError> {
        if consume_failure(&self.kill_switch_failures) {
            self.journal.record(format!("kill_switch {enable} failed"));
            return Err(CollaboratorError::Actuator(String::from("kill switch")));
        }
        self.journal.record(format!("kill_switch {enable}"));
        Ok(())
    }

    async fn enable_buzzer(&self) -> Result<(), CollaboratorError> {
        if self.buzzer_broken.load(Ordering::Acquire) {
            return Err(CollaboratorError::Actuator(String::from("buzzer")));
        }
        self.journal.record("buzzer");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingAutopilot {
    pub journal: Journal,
    pub arm_requested: AtomicBool,
}

impl RecordingAutopilot {
    pub fn request_arm(&self) { self.arm_requested.store(true, Ordering::Release); }
}

#[async_trait]
impl Autopilot for RecordingAutopilot {
    fn poll_arm_request(&self) -> bool { self.arm_requested.swap(false, Ordering::AcqRel) }

    async fn send_command(&self, command: AutopilotCommand, _payload: CommandPayload) -> Result<(), FrameError> {
        self.journal.record(format!("autopilot {command}"));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FlakyPeers {
    pub journal: Journal,
    pub failures: AtomicUsize,
}

#[async_trait]
impl PeerRegistry for FlakyPeers {
    async fn check_ready(&self, peer: Peer) -> Result<(), CollaboratorError> {
        if consume_failure(&self.failures) {
            return Err(CollaboratorError::NotReady(peer));
        }
        self.journal.record(format!("ready {peer}"));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingFlightControl {
    pub journal: Journal,
}

#[async_trait]
impl FlightControl for RecordingFlightControl {
    async fn take_control(&self, cancel: CancellationToken) {
        self.journal.record("take_control");
        cancel.cancelled().await;
    }
}
