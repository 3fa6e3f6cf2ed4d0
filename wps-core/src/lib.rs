pub mod config;
pub mod credential;
pub mod device;
pub mod driver;
pub mod session;

use std::sync::Arc;

pub use config::EnrolleeConfig;
pub use credential::{Credential, CredentialOffer, CredentialStore};
pub use device::DeviceInfo;
pub use driver::{
    CodecFactory, CodecParams, ConnectRequest, EapolSender, ProcessResult, ScanCandidate,
    WifiManager, WifiState, WscCodec, WscIes,
};
pub use session::{Method, Session, SessionEvent, SessionStatus, Target};

/// Notifications delivered to the caller of `start()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WpsEvent {
    Complete(Credential),
    /// PIN to show the user; PIN sessions only, before discovery.
    Pin(String),
    SessionOverlap,
    Timeout,
    ScanError,
    Failure,
    Canceled,
}

impl WpsEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WpsEvent::Pin(_))
    }
}

pub type EventCallback = Arc<dyn Fn(WpsEvent) + Send + Sync>;
