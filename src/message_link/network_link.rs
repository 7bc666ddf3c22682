use super::board_identity::mac_board_id;
use super::http_client::HTTPClient;
use super::{LinkError, Mailbox, MessageLink, ServerReply, Topic};
use crate::config::SecurityConfig;
use crate::{error, info, log, warn};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

/// Live backend: MQTT broker for publications and subscriptions, one-shot
/// HTTP requests for synchronous queries.
pub struct NetworkLink {
    configured_id: Option<String>,
    mqtt_host: String,
    mqtt_port: u16,
    http: HTTPClient,
    board_id: OnceLock<String>,
    client: OnceLock<AsyncClient>,
    mailbox: Arc<Mailbox>,
    /// Set on every broker `ConnAck`, cleared on every connection error.
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl NetworkLink {
    const KEEP_ALIVE: Duration = Duration::from_secs(3600);
    const RECONNECT_DELAY: Duration = Duration::from_secs(1);
    const REQUEST_CAP: usize = 10;

    /// Creates an unconnected link. Nothing touches the network before `init`.
    ///
    /// # Arguments
    /// * `config` – Endpoints and the optional fixed board identity.
    /// * `cancel` – Stops the subscription listener once cancelled.
    pub fn new(config: &SecurityConfig, cancel: CancellationToken) -> Result<Self, LinkError> {
        Ok(Self {
            configured_id: config.board_id().map(str::to_string),
            mqtt_host: config.mqtt_host().to_string(),
            mqtt_port: config.mqtt_port(),
            http: HTTPClient::new(config.server_url(), HTTPClient::CONNECTION_TIMEOUT)?,
            board_id: OnceLock::new(),
            client: OnceLock::new(),
            mailbox: Arc::new(Mailbox::new()),
            connected: Arc::new(AtomicBool::new(false)),
            cancel,
        })
    }

    /// Whether the broker session is currently established.
    pub fn is_connected(&self) -> bool { self.connected.load(Ordering::Acquire) }

    fn resolve_board_id(&self) -> Result<String, LinkError> {
        if let Some(id) = &self.configured_id {
            return Ok(id.clone());
        }
        mac_board_id().ok_or_else(|| {
            error!("Failed to derive the board identity from a MAC address");
            LinkError::NoIdentity
        })
    }

    /// Drains the broker event loop into the mailbox until cancelled.
    ///
    /// Subscriptions are (re)issued on every `ConnAck`, so a reconnect after
    /// a dropped session restores them.
    async fn run_listener(
        client: AsyncClient,
        mut eventloop: EventLoop,
        routes: HashMap<String, Topic>,
        mailbox: Arc<Mailbox>,
        connected: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = eventloop.poll() => event,
            };
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected.store(true, Ordering::Release);
                    for address in routes.keys() {
                        if let Err(e) = client.try_subscribe(address.as_str(), QoS::AtMostOnce) {
                            warn!("Failed to subscribe to '{address}': {e}");
                        }
                    }
                    info!("Connected to broker, subscribed to {} topics", routes.len());
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some(topic) = routes.get(&publish.topic) else {
                        warn!("Dropping publication on unexpected topic '{}'", publish.topic);
                        continue;
                    };
                    let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                    if mailbox.store(*topic, payload).is_some() {
                        log!("Unread publication on {topic} was overwritten");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    connected.store(false, Ordering::Release);
                    warn!("Broker connection failed: {e}. Trying again in 1s");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(Self::RECONNECT_DELAY) => {}
                    }
                }
            }
        }
        connected.store(false, Ordering::Release);
    }
}

#[async_trait]
impl MessageLink for NetworkLink {
    async fn init(&self) -> Result<(), LinkError> {
        if self.board_id.get().is_some() {
            return Ok(());
        }
        let board_id = self.resolve_board_id()?;

        let mut options =
            MqttOptions::new(format!("flight-guard-{board_id}"), self.mqtt_host.as_str(), self.mqtt_port);
        options.set_keep_alive(Self::KEEP_ALIVE);
        let (client, eventloop) = AsyncClient::new(options, Self::REQUEST_CAP);

        // Only the init that claims the client runs a listener; a losing
        // concurrent call drops its unpolled event loop.
        if self.client.set(client.clone()).is_err() {
            return Ok(());
        }
        let _ = self.board_id.set(board_id.clone());

        let routes: HashMap<String, Topic> = Topic::iter()
            .filter(|t| t.is_subscription())
            .map(|t| (t.address(&board_id), t))
            .collect();
        tokio::spawn(Self::run_listener(
            client,
            eventloop,
            routes,
            Arc::clone(&self.mailbox),
            Arc::clone(&self.connected),
            self.cancel.clone(),
        ));
        info!(
            "Network link initialized as board '{board_id}' (broker {}:{}, server {})",
            self.mqtt_host,
            self.mqtt_port,
            self.http.url()
        );
        Ok(())
    }

    fn board_id(&self) -> Option<String> { self.board_id.get().cloned() }

    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), LinkError> {
        let (Some(client), Some(board_id)) = (self.client.get(), self.board_id.get()) else {
            return Err(LinkError::NotInitialized);
        };
        if !self.is_connected() {
            return Err(LinkError::NoConnection);
        }
        // A full request queue is reported instead of waited on.
        client.try_publish(topic.address(board_id), QoS::AtMostOnce, false, payload.as_bytes().to_vec())?;
        Ok(())
    }

    fn receive(&self, topic: Topic) -> Option<String> { self.mailbox.take(topic) }

    async fn request(&self, query: &str) -> Result<ServerReply, LinkError> {
        let reply = self.http.get_envelope(query).await;
        match &reply {
            Ok(ServerReply::Timeout) => warn!("Connection to {} timed out", self.http.url()),
            Err(e) => warn!("Request to {} failed: {e}", self.http.url()),
            Ok(ServerReply::Response(_)) => {}
        }
        reply
    }
}
