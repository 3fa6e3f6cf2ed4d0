use crate::FrameError;

pub const EAP_HDR_LEN: usize = 4;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl EapCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapCode::Request),
            2 => Some(EapCode::Response),
            3 => Some(EapCode::Success),
            4 => Some(EapCode::Failure),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum EapType {
    Identity = 1,
    Notification = 2,
    Nak = 3, // Response only
    Expanded = 254,
}

/// Borrowed view of an EAP packet; `body` is bounded by the declared length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EapView<'a> {
    pub code: EapCode,
    pub identifier: u8,
    pub body: &'a [u8],
}

impl<'a> EapView<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, FrameError> {
        if data.len() < EAP_HDR_LEN {
            return Err(FrameError::Truncated(data.len()));
        }
        let code = EapCode::from_u8(data[0]).ok_or(FrameError::UnknownEapCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if length < EAP_HDR_LEN || length > data.len() {
            return Err(FrameError::LengthMismatch {
                declared: length,
                available: data.len(),
            });
        }
        Ok(EapView {
            code,
            identifier,
            body: &data[EAP_HDR_LEN..length],
        })
    }

    /// The method type byte, present on Request/Response packets only.
    pub fn method(&self) -> Option<u8> {
        self.body.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapPacket {
    pub code: EapCode,
    pub identifier: u8,
    pub data: Vec<u8>,
}

impl EapPacket {
    pub fn to_bytes(&self) -> Vec<u8> {
        let length = (EAP_HDR_LEN + self.data.len()) as u16;
        let mut bytes = Vec::with_capacity(length as usize);
        bytes.push(self.code as u8);
        bytes.push(self.identifier);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

pub fn create_identity_response(identifier: u8, identity: &str) -> EapPacket {
    let mut data = vec![EapType::Identity as u8];
    data.extend_from_slice(identity.as_bytes());
    EapPacket {
        code: EapCode::Response,
        identifier,
        data,
    }
}
