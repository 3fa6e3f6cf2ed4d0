use pnet_base::MacAddr;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::device::DeviceInfo;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    #[default]
    Disabled,
    PushButton,
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Disabled,
    Scanning,
    Pending,
    Success,
    DisableRequested,
}

/// The single registrar picked by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub ssid: Vec<u8>,
    pub bssid: MacAddr,
    pub channel: u8,
}

/// Everything the run-loop learns or decides during one enrollment.
#[derive(Debug, Clone)]
pub struct Session {
    pub method: Method,
    pub status: SessionStatus,
    pub own_mac: MacAddr,
    pub device: DeviceInfo,
    /// Unset until discovery succeeds.
    pub target: Option<Target>,
    pub discover_count: usize,
    pub start_time: Instant,
    pub deadline: Option<Instant>,
}

impl Session {
    pub fn new(method: Method, device: DeviceInfo) -> Self {
        Session {
            method,
            status: SessionStatus::Disabled,
            own_mac: device.mac,
            device,
            target: None,
            discover_count: 0,
            start_time: Instant::now(),
            deadline: None,
        }
    }

    pub fn target_bssid(&self) -> Option<MacAddr> {
        self.target.as_ref().map(|t| t.bssid)
    }

    pub fn arm_deadline(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Time left before the negotiation deadline, if one is armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Stimuli consumed by the run-loop, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Raw EAPOL body received from `src`, copied out of the driver buffer.
    Frame { src: MacAddr, payload: Vec<u8> },
    /// The station associated with the target.
    Associated,
    Success,
    Failure,
    Timeout,
    Disconnected,
    /// The deferred post-success disconnect timer fired.
    DisconnectTimer,
    Cancel,
}
