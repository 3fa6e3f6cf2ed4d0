//! Reader for the WSC attributes advertised in beacon and probe-response
//! vendor IEs. Only the attributes needed to pick a registrar are decoded.

/// Wi-Fi Simple Configuration Technical Specification v2.0.7, Section 12
pub const ATTR_DEVICE_PASSWORD_ID: u16 = 0x1012;
pub const ATTR_SELECTED_REGISTRAR: u16 = 0x1041;
pub const ATTR_WPS_STATE: u16 = 0x1044;

pub const DEV_PW_DEFAULT: u16 = 0x0000;
pub const DEV_PW_USER_SPECIFIED: u16 = 0x0001;
pub const DEV_PW_PUSHBUTTON: u16 = 0x0004;
pub const DEV_PW_REGISTRAR_SPECIFIED: u16 = 0x0005;

const ATTR_HDR_LEN: usize = 4;

/// Iterates `(type, value)` pairs. Stops at the first attribute whose
/// declared length runs past the buffer.
pub struct AttributeReader<'a> {
    bytes: &'a [u8],
}

impl<'a> AttributeReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        AttributeReader { bytes }
    }
}

impl<'a> Iterator for AttributeReader<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.len() < ATTR_HDR_LEN {
            return None;
        }
        let attr_type = u16::from_be_bytes([self.bytes[0], self.bytes[1]]);
        let len = u16::from_be_bytes([self.bytes[2], self.bytes[3]]) as usize;
        let rest = &self.bytes[ATTR_HDR_LEN..];
        if rest.len() < len {
            self.bytes = &[];
            return None;
        }
        let (value, tail) = rest.split_at(len);
        self.bytes = tail;
        Some((attr_type, value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrarState {
    pub selected_registrar: bool,
    pub device_password_id: Option<u16>,
}

impl RegistrarState {
    pub fn parse(ie: &[u8]) -> Self {
        let mut state = RegistrarState::default();
        for (attr_type, value) in AttributeReader::new(ie) {
            match attr_type {
                ATTR_SELECTED_REGISTRAR => {
                    state.selected_registrar = value.first().map_or(false, |v| *v != 0);
                }
                ATTR_DEVICE_PASSWORD_ID if value.len() == 2 => {
                    state.device_password_id = Some(u16::from_be_bytes([value[0], value[1]]));
                }
                _ => {}
            }
        }
        state
    }

    pub fn is_push_button(&self) -> bool {
        self.selected_registrar && self.device_password_id == Some(DEV_PW_PUSHBUTTON)
    }

    pub fn is_pin(&self) -> bool {
        self.selected_registrar
            && matches!(
                self.device_password_id,
                Some(DEV_PW_DEFAULT | DEV_PW_USER_SPECIFIED | DEV_PW_REGISTRAR_SPECIFIED)
            )
    }
}

/// Encodes attributes in the same TLV layout the reader consumes.
pub fn encode_attributes(attrs: &[(u16, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (attr_type, value) in attrs {
        out.extend_from_slice(&attr_type.to_be_bytes());
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value);
    }
    out
}
