//! EAP-WSC: Wi-Fi Simple Configuration messages carried in EAP-Expanded
//! (type 254) packets.
//!
//! ```text
//! +------+----------------+---------------------+--------+-------+-------------+------
//! | 254  | Vendor-Id (3)  | Vendor-Type (4)     | Op-Code| Flags | Length (2)? | Data
//! +------+----------------+---------------------+--------+-------+-------------+------
//! ```

use crate::eap::{EapCode, EapPacket, EapType};
use crate::FrameError;

pub const WFA_VENDOR_ID: u32 = 0x00_37_2A;
pub const WFA_VENDOR_TYPE_SIMPLE_CONFIG: u32 = 1;

/// Type byte, vendor id and vendor type.
pub const EXPANDED_HDR_LEN: usize = 8;
/// Expanded header plus op-code and flags.
pub const WSC_HDR_LEN: usize = EXPANDED_HDR_LEN + 2;

pub const ENROLLEE_IDENTITY: &str = "WFA-SimpleConfig-Enrollee-1-0";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum WscOpcode {
    Start = 1,
    Ack = 2,
    Nack = 3,
    Msg = 4,
    Done = 5,
    FragAck = 6,
}

impl TryFrom<u8> for WscOpcode {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WscOpcode::Start),
            2 => Ok(WscOpcode::Ack),
            3 => Ok(WscOpcode::Nack),
            4 => Ok(WscOpcode::Msg),
            5 => Ok(WscOpcode::Done),
            6 => Ok(WscOpcode::FragAck),
            _ => Err(FrameError::UnknownOpcode(value)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct WscFlags(pub u8);

impl WscFlags {
    pub const MORE_FRAGMENTS: u8 = 0x01;
    pub const LENGTH_FIELD: u8 = 0x02;

    pub fn more_fragments(self) -> bool {
        self.0 & Self::MORE_FRAGMENTS != 0
    }

    pub fn has_length(self) -> bool {
        self.0 & Self::LENGTH_FIELD != 0
    }
}

/// One EAP-WSC frame, possibly a single fragment of a larger message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WscFrame<'a> {
    pub opcode: WscOpcode,
    pub flags: WscFlags,
    pub message_length: Option<u16>,
    pub data: &'a [u8],
}

impl<'a> WscFrame<'a> {
    /// Parses the method-specific body of an EAP Request/Response, starting
    /// at the type byte.
    pub fn parse(body: &'a [u8]) -> Result<Self, FrameError> {
        if body.len() < WSC_HDR_LEN {
            return Err(FrameError::Truncated(body.len()));
        }
        if body[0] != EapType::Expanded as u8 {
            return Err(FrameError::UnsupportedMethod(body[0]));
        }
        let vendor_id = u32::from_be_bytes([0, body[1], body[2], body[3]]);
        let vendor_type = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
        if vendor_id != WFA_VENDOR_ID || vendor_type != WFA_VENDOR_TYPE_SIMPLE_CONFIG {
            return Err(FrameError::NotWsc {
                vendor_id,
                vendor_type,
            });
        }
        let opcode = WscOpcode::try_from(body[8])?;
        let flags = WscFlags(body[9]);

        let mut offset = WSC_HDR_LEN;
        let message_length = if flags.has_length() {
            if body.len() < offset + 2 {
                return Err(FrameError::Truncated(body.len()));
            }
            let len = u16::from_be_bytes([body[offset], body[offset + 1]]);
            offset += 2;
            Some(len)
        } else {
            None
        };

        Ok(WscFrame {
            opcode,
            flags,
            message_length,
            data: &body[offset..],
        })
    }
}

fn expanded_header(opcode: WscOpcode, flags: WscFlags) -> Vec<u8> {
    let mut data = Vec::with_capacity(WSC_HDR_LEN);
    data.push(EapType::Expanded as u8);
    data.extend_from_slice(&WFA_VENDOR_ID.to_be_bytes()[1..]);
    data.extend_from_slice(&WFA_VENDOR_TYPE_SIMPLE_CONFIG.to_be_bytes());
    data.push(opcode as u8);
    data.push(flags.0);
    data
}

/// Builds an EAP packet carrying one WSC frame. `message_length` is only
/// written when the LF flag is set.
pub fn build_wsc_packet(
    code: EapCode,
    identifier: u8,
    opcode: WscOpcode,
    flags: WscFlags,
    message_length: Option<u16>,
    message: &[u8],
) -> EapPacket {
    let mut data = expanded_header(opcode, flags);
    if flags.has_length() {
        data.extend_from_slice(&message_length.unwrap_or(message.len() as u16).to_be_bytes());
    }
    data.extend_from_slice(message);
    EapPacket {
        code,
        identifier,
        data,
    }
}

pub fn create_wsc_response(identifier: u8, opcode: WscOpcode, message: &[u8]) -> EapPacket {
    build_wsc_packet(
        EapCode::Response,
        identifier,
        opcode,
        WscFlags::default(),
        None,
        message,
    )
}

pub fn create_frag_ack(identifier: u8) -> EapPacket {
    create_wsc_response(identifier, WscOpcode::FragAck, &[])
}
