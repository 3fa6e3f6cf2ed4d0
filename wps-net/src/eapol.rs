// EAPOL Packet Definitions
// Based on IEEE 802.1X

use crate::FrameError;

/// Ethertype carried by EAPOL frames.
pub const ETH_P_EAPOL: u16 = 0x888E;

/// Protocol version written into frames we originate.
pub const EAPOL_VERSION: u8 = 1;

pub const EAPOL_HDR_LEN: usize = 4;

// EAPOL Packet Type
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum EapolType {
    Eap = 0,
    Start = 1,
    Logoff = 2,
    Key = 3,
    EncapsulatedAsfAlert = 4,
}

impl EapolType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(EapolType::Eap),
            1 => Some(EapolType::Start),
            2 => Some(EapolType::Logoff),
            3 => Some(EapolType::Key),
            4 => Some(EapolType::EncapsulatedAsfAlert),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EapolPacket<'a> {
    pub version: u8,
    pub packet_type: EapolType,
    pub length: u16,
    pub payload: &'a [u8],
}

impl<'a> EapolPacket<'a> {
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, FrameError> {
        if data.len() < EAPOL_HDR_LEN {
            return Err(FrameError::Truncated(data.len()));
        }
        let version = data[0];
        let packet_type =
            EapolType::from_u8(data[1]).ok_or(FrameError::UnknownEapolType(data[1]))?;
        let length = u16::from_be_bytes([data[2], data[3]]);
        let available = data.len() - EAPOL_HDR_LEN;
        if length as usize > available {
            return Err(FrameError::LengthMismatch {
                declared: length as usize,
                available,
            });
        }
        let payload = &data[EAPOL_HDR_LEN..EAPOL_HDR_LEN + length as usize];

        Ok(EapolPacket {
            version,
            packet_type,
            length,
            payload,
        })
    }
}

/// Wraps `payload` in an EAPOL header of the given type.
pub fn build_eapol(packet_type: EapolType, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; EAPOL_HDR_LEN + payload.len()];
    frame[0] = EAPOL_VERSION;
    frame[1] = packet_type as u8;
    frame[2..4].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    frame[EAPOL_HDR_LEN..].copy_from_slice(payload);
    frame
}

pub fn build_eapol_start() -> Vec<u8> {
    build_eapol(EapolType::Start, &[])
}
