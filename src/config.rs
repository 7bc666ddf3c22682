use std::env;
use strum_macros::Display;

/// Which transport backend the security module talks through.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum LinkMode {
    /// Scripted, deterministic fixtures. No network access.
    Offline,
    /// MQTT broker subscription plus HTTP requests to the ATM server.
    Online,
}

impl From<&str> for LinkMode {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "online" => LinkMode::Online,
            _ => LinkMode::Offline,
        }
    }
}

/// Fixed identity and endpoint settings, read once at startup.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    board_id: Option<String>,
    link_mode: LinkMode,
    server_url: String,
    mqtt_host: String,
    mqtt_port: u16,
    autopilot_addr: String,
}

impl SecurityConfig {
    const DEF_SERVER_URL: &'static str = "http://localhost:8080";
    const DEF_MQTT_HOST: &'static str = "localhost";
    const DEF_MQTT_PORT: u16 = 1883;
    const DEF_AUTOPILOT_ADDR: &'static str = "127.0.0.1:5765";

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self { Self::from_lookup(|key| env::var(key).ok()) }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Arguments
    /// * `lookup` – Returns the raw value for a variable name, if set.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let board_id = lookup("BOARD_ID").filter(|id| !id.trim().is_empty());
        let link_mode = lookup("SECURITY_LINK").map_or(LinkMode::Offline, |m| LinkMode::from(m.as_str()));
        let server_url = lookup("ATM_SERVER_URL")
            .map_or_else(|| Self::DEF_SERVER_URL.to_string(), |url| url.trim_end_matches('/').to_string());
        let mqtt_host = lookup("ATM_MQTT_HOST").unwrap_or_else(|| Self::DEF_MQTT_HOST.to_string());
        let mqtt_port = lookup("ATM_MQTT_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(Self::DEF_MQTT_PORT);
        let autopilot_addr =
            lookup("AUTOPILOT_ADDR").unwrap_or_else(|| Self::DEF_AUTOPILOT_ADDR.to_string());
        Self { board_id, link_mode, server_url, mqtt_host, mqtt_port, autopilot_addr }
    }

    pub fn board_id(&self) -> Option<&str> { self.board_id.as_deref() }
    pub fn link_mode(&self) -> LinkMode { self.link_mode }
    pub fn server_url(&self) -> &str { &self.server_url }
    pub fn mqtt_host(&self) -> &str { &self.mqtt_host }
    pub fn mqtt_port(&self) -> u16 { self.mqtt_port }
    pub fn autopilot_addr(&self) -> &str { &self.autopilot_addr }
}
