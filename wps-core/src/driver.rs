//! Capabilities the enrollee consumes from the platform: the Wi-Fi
//! management layer, the EAPOL transmit path and the WSC message codec.

use async_trait::async_trait;
use pnet_base::MacAddr;
use std::time::Duration;
use wps_net::WscOpcode;

use crate::credential::CredentialOffer;
use crate::device::DeviceInfo;
use crate::session::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    /// Station idle while a soft-AP role is active.
    IdleWithAp,
    Scanning,
    Connecting,
    Connected,
    Disconnecting,
}

impl WifiState {
    pub fn is_idle(self) -> bool {
        matches!(self, WifiState::Idle | WifiState::IdleWithAp)
    }

    pub fn is_associated(self) -> bool {
        matches!(self, WifiState::Connecting | WifiState::Connected)
    }
}

pub const CAPABILITY_PRIVACY: u16 = 0x0010;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCandidate {
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub channel: u8,
    pub capability_info: u16,
    /// Whether the BSS advertises an RSN or WPA element.
    pub has_rsn: bool,
    /// WSC attributes from the vendor IE, empty when the BSS has none.
    pub wsc_ie: Vec<u8>,
}

impl ScanCandidate {
    /// Privacy without RSN/WPA means static WEP.
    pub fn is_wep(&self) -> bool {
        self.capability_info & CAPABILITY_PRIVACY != 0 && !self.has_rsn
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub ssid: Vec<u8>,
    pub bssid: Option<MacAddr>,
    pub channel: u8,
    /// Prefer this BSS but let the driver fall back after `validity`.
    pub suggested: bool,
    pub validity: Duration,
}

/// WSC IEs appended to probe and association requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WscIes {
    pub probe_request: Vec<u8>,
    pub assoc_request: Vec<u8>,
}

#[async_trait]
pub trait WifiManager: Send + Sync {
    async fn own_mac(&self) -> anyhow::Result<MacAddr>;
    async fn state(&self) -> WifiState;
    async fn scan(&self, channels: &[u8]) -> anyhow::Result<Vec<ScanCandidate>>;
    async fn connect(&self, request: &ConnectRequest) -> anyhow::Result<()>;
    async fn disconnect(&self) -> anyhow::Result<()>;
    async fn disable_station(&self) -> anyhow::Result<()>;
    async fn set_auto_reconnect(&self, enabled: bool) -> anyhow::Result<()>;
    /// `None` clears previously installed IEs.
    async fn set_wsc_ies(&self, ies: Option<WscIes>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait EapolSender: Send + Sync {
    async fn send_eapol(
        &self,
        src: MacAddr,
        dst: MacAddr,
        ethertype: u16,
        payload: &[u8],
    ) -> anyhow::Result<()>;
}

/// Result of feeding one complete WSC message to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Message accepted; a response is ready.
    Continue,
    /// Protocol run complete; a final response may be ready.
    Done,
    Failure,
    Ignore,
    /// The codec needs more input before it can respond.
    Fragment,
}

/// The registration protocol itself (key exchange, message building and
/// verification). Opaque to the enrollee.
pub trait WscCodec: Send + Sync {
    fn build_probe_request_ie(&self) -> Vec<u8>;
    fn build_assoc_request_ie(&self) -> Vec<u8>;
    fn process_message(&mut self, opcode: WscOpcode, message: &[u8]) -> ProcessResult;
    fn next_message(&mut self) -> Option<(WscOpcode, Vec<u8>)>;
    /// Credentials received since the last call, in registrar order.
    fn take_credentials(&mut self) -> Vec<CredentialOffer>;
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct CodecParams {
    pub device: DeviceInfo,
    pub method: Method,
    pub pin: Option<String>,
}

pub trait CodecFactory: Send + Sync {
    fn create(&self, params: &CodecParams) -> anyhow::Result<Box<dyn WscCodec>>;
}
