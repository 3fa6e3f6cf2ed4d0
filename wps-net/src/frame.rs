//! Demultiplexes an inbound EAPOL body into the requests the enrollee acts on.

use crate::eap::{EapCode, EapType, EapView};
use crate::eapol::{EapolPacket, EapolType};
use crate::wsc::WscFrame;
use crate::FrameError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Inbound<'a> {
    IdentityRequest { identifier: u8 },
    Wsc { identifier: u8, frame: WscFrame<'a> },
    Failure { identifier: u8 },
}

/// Decodes the payload of an ethertype-EAPOL frame.
///
/// Every rejection is a reason to drop the frame; none of them end the
/// session.
pub fn decode(payload: &[u8]) -> Result<Inbound<'_>, FrameError> {
    let eapol = EapolPacket::from_bytes(payload)?;
    if eapol.packet_type != EapolType::Eap {
        return Err(FrameError::NotEap(eapol.packet_type));
    }
    let eap = EapView::parse(eapol.payload)?;
    match eap.code {
        EapCode::Failure => Ok(Inbound::Failure {
            identifier: eap.identifier,
        }),
        EapCode::Request => match eap.method() {
            Some(m) if m == EapType::Identity as u8 => Ok(Inbound::IdentityRequest {
                identifier: eap.identifier,
            }),
            Some(m) if m == EapType::Expanded as u8 => Ok(Inbound::Wsc {
                identifier: eap.identifier,
                frame: WscFrame::parse(eap.body)?,
            }),
            Some(m) => Err(FrameError::UnsupportedMethod(m)),
            None => Err(FrameError::Truncated(eap.body.len())),
        },
        code => Err(FrameError::UnexpectedCode(code)),
    }
}
