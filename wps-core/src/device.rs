//! Identity the enrollee advertises: factory strings, UUID-E and PIN.

use pnet_base::MacAddr;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::EnrolleeConfig;

/// Wi-Fi Simple Configuration Technical Specification v2.0.7, Section 12, Table 28
pub const MANUFACTURER_ATTR_MAX_LEN: usize = 64;
pub const MODEL_NUMBER_ATTR_MAX_LEN: usize = 32;
pub const MODEL_NAME_ATTR_MAX_LEN: usize = 32;
pub const DEVICE_NAME_ATTR_MAX_LEN: usize = 32;
pub const SERIAL_NUMBER_ATTR_MAX_LEN: usize = 32;

pub const DEFAULT_MANUFACTURER: &str = "Generic Wireless";
pub const DEFAULT_MODEL_NUMBER: &str = "1.0";
pub const DEFAULT_MODEL_NAME: &str = "WPS Enrollee";
pub const DEFAULT_DEVICE_NAME: &str = "Wireless Station";
pub const DEFAULT_SERIAL_NUMBER: &str = "0000";

const UUID_NAMESPACE: [u8; 16] = [
    0x52, 0x64, 0x80, 0xf8, 0xc9, 0x9b, 0x4b, 0xe5, 0xa6, 0x55, 0x58, 0xed, 0x5f, 0x5d, 0x60, 0x84,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub mac: MacAddr,
    pub uuid: Uuid,
    pub manufacturer: String,
    pub model_number: String,
    pub model_name: String,
    pub device_name: String,
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn new(mac: MacAddr, config: &EnrolleeConfig) -> Self {
        DeviceInfo {
            mac,
            uuid: uuid_from_mac(mac),
            manufacturer: factory_string(
                config.manufacturer.as_deref(),
                DEFAULT_MANUFACTURER,
                MANUFACTURER_ATTR_MAX_LEN,
            ),
            model_number: factory_string(
                config.model_number.as_deref(),
                DEFAULT_MODEL_NUMBER,
                MODEL_NUMBER_ATTR_MAX_LEN,
            ),
            model_name: factory_string(
                config.model_name.as_deref(),
                DEFAULT_MODEL_NAME,
                MODEL_NAME_ATTR_MAX_LEN,
            ),
            device_name: factory_string(
                config.device_name.as_deref(),
                DEFAULT_DEVICE_NAME,
                DEVICE_NAME_ATTR_MAX_LEN,
            ),
            serial_number: factory_string(
                config.serial_number.as_deref(),
                DEFAULT_SERIAL_NUMBER,
                SERIAL_NUMBER_ATTR_MAX_LEN,
            ),
        }
    }
}

/// Empty or missing values fall back to `default`; long values are cut at
/// the last char boundary within `max_len` bytes.
fn factory_string(value: Option<&str>, default: &str, max_len: usize) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    };
    let mut end = value.len().min(max_len);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Name-based UUID-E: SHA-256 over a fixed namespace and the MAC address,
/// truncated and stamped with the version 5 / RFC 4122 variant bits.
pub fn uuid_from_mac(mac: MacAddr) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(UUID_NAMESPACE);
    hasher.update(mac.octets());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    bytes[6] = (5 << 4) | (bytes[6] & 0x0f);
    bytes[8] = 0x80 | (bytes[8] & 0x3f);
    Uuid::from_bytes(bytes)
}

/// Check digit for a 7-digit PIN.
pub fn pin_checksum(mut pin: u32) -> u32 {
    let mut accum = 0;
    while pin > 0 {
        accum += 3 * (pin % 10);
        pin /= 10;
        accum += pin % 10;
        pin /= 10;
    }
    (10 - accum % 10) % 10
}

pub fn generate_pin<R: Rng + ?Sized>(rng: &mut R) -> String {
    let base = rng.gen_range(0..10_000_000u32);
    format!("{:08}", base * 10 + pin_checksum(base))
}

pub fn validate_pin(pin: &str) -> bool {
    if pin.len() != 8 || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match pin.parse::<u32>() {
        Ok(value) => pin_checksum(value / 10) == value % 10,
        Err(_) => false,
    }
}
