use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::session::Method;

// Helper functions for default values
fn default_discovery_timeout_secs() -> u64 { 120 }
fn default_negotiation_timeout_secs() -> u64 { 120 }
fn default_success_disconnect_delay_ms() -> u64 { 1000 }
fn default_settle_delay_ms() -> u64 { 100 }
fn default_connect_validity_secs() -> u64 { 5 }
fn default_event_queue_depth() -> usize { 8 }
fn default_identity() -> String { wps_net::wsc::ENROLLEE_IDENTITY.to_string() }

/// Enrollee configuration. Everything but `method` may be omitted.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EnrolleeConfig {
    pub method: Method,

    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_number: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,

    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,
    #[serde(default = "default_negotiation_timeout_secs")]
    pub negotiation_timeout_secs: u64,
    #[serde(default = "default_success_disconnect_delay_ms")]
    pub success_disconnect_delay_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_connect_validity_secs")]
    pub connect_validity_secs: u64,

    /// Channels to scan; empty scans every channel the driver supports.
    #[serde(default)]
    pub channels: Vec<u8>,
    #[serde(default = "default_event_queue_depth")]
    pub event_queue_depth: usize,
    #[serde(default = "default_identity")]
    pub identity: String,
}

impl EnrolleeConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            manufacturer: None,
            model_number: None,
            model_name: None,
            device_name: None,
            serial_number: None,
            discovery_timeout_secs: default_discovery_timeout_secs(),
            negotiation_timeout_secs: default_negotiation_timeout_secs(),
            success_disconnect_delay_ms: default_success_disconnect_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            connect_validity_secs: default_connect_validity_secs(),
            channels: Vec::new(),
            event_queue_depth: default_event_queue_depth(),
            identity: default_identity(),
        }
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_secs(self.negotiation_timeout_secs)
    }

    pub fn success_disconnect_delay(&self) -> Duration {
        Duration::from_millis(self.success_disconnect_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn connect_validity(&self) -> Duration {
        Duration::from_secs(self.connect_validity_secs)
    }
}

impl Default for EnrolleeConfig {
    fn default() -> Self {
        Self::new(Method::PushButton)
    }
}
