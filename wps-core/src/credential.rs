use pnet_base::MacAddr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub ssid: Vec<u8>,
    pub passphrase: Vec<u8>,
    pub bssid: MacAddr,
}

/// A credential as proposed by the registrar, before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialOffer {
    pub ssid: Vec<u8>,
    pub passphrase: Vec<u8>,
    pub bssid: MacAddr,
}

/// Keeps at most one credential: the latest one whose SSID matches the
/// network picked during discovery.
#[derive(Debug, Default)]
pub struct CredentialStore {
    target_ssid: Vec<u8>,
    retained: Option<Credential>,
    accepted: usize,
}

impl CredentialStore {
    pub fn new(target_ssid: &[u8]) -> Self {
        CredentialStore {
            target_ssid: target_ssid.to_vec(),
            retained: None,
            accepted: 0,
        }
    }

    /// Rebinds the store to a newly discovered network, dropping anything
    /// retained for the previous one.
    pub fn set_target(&mut self, target_ssid: &[u8]) {
        *self = CredentialStore::new(target_ssid);
    }

    pub fn offer(&mut self, index: usize, ssid: &[u8], passphrase: &[u8], bssid: MacAddr) -> bool {
        if ssid != self.target_ssid.as_slice() {
            warn!(
                "Dropping credential #{} for SSID {:?}, expected {:?}",
                index,
                String::from_utf8_lossy(ssid),
                String::from_utf8_lossy(&self.target_ssid)
            );
            return false;
        }
        if self.retained.is_some() {
            debug!("Credential #{} replaces the previously accepted one", index);
        }
        info!("Accepted credential #{} for {}", index, bssid);
        self.retained = Some(Credential {
            ssid: ssid.to_vec(),
            passphrase: passphrase.to_vec(),
            bssid,
        });
        self.accepted = 1;
        true
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn retained(&self) -> Option<&Credential> {
        self.retained.as_ref()
    }

    /// The credential to deliver, only when exactly one was accepted.
    pub fn finalize(&self) -> Option<Credential> {
        if self.accepted == 1 {
            self.retained.clone()
        } else {
            None
        }
    }
}
