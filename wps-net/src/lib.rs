pub mod eap;
pub mod eapol;
pub mod fragment;
pub mod frame;
pub mod ie;
pub mod wsc;

use thiserror::Error;

pub use fragment::{FragmentError, Reassembler, Reassembly};
pub use frame::{decode, Inbound};
pub use wsc::{WscFlags, WscFrame, WscOpcode};

/// Reasons an inbound EAPOL frame is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short ({0} bytes)")]
    Truncated(usize),
    #[error("unknown EAPOL packet type {0}")]
    UnknownEapolType(u8),
    #[error("EAPOL {0:?} frame does not carry EAP")]
    NotEap(eapol::EapolType),
    #[error("declared length {declared} does not fit {available} available bytes")]
    LengthMismatch { declared: usize, available: usize },
    #[error("unknown EAP code {0}")]
    UnknownEapCode(u8),
    #[error("EAP {0:?} is not expected by an enrollee")]
    UnexpectedCode(eap::EapCode),
    #[error("unsupported EAP method {0}")]
    UnsupportedMethod(u8),
    #[error("expanded method {vendor_id:#08x}/{vendor_type} is not WSC")]
    NotWsc { vendor_id: u32, vendor_type: u32 },
    #[error("unknown WSC op-code {0}")]
    UnknownOpcode(u8),
}
