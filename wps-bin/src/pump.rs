//! WSC message pump: feeds reassembled registrar messages to the codec and
//! transmits the codec's responses back over EAPOL.

use pnet_base::MacAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use wps_core::{CredentialOffer, EapolSender, ProcessResult, WscCodec, WscIes};
use wps_net::eap::{create_identity_response, EapPacket};
use wps_net::eapol::{build_eapol, build_eapol_start, EapolType, ETH_P_EAPOL};
use wps_net::wsc::{create_frag_ack, create_wsc_response};
use wps_net::{FragmentError, Reassembler, Reassembly, WscFrame};

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("fragment state violation: {0}")]
    Fragment(#[from] FragmentError),
    #[error("codec has no response queued")]
    NoResponse,
    #[error("no registrar attached")]
    NotAttached,
    #[error("EAPOL transmit failed: {0:#}")]
    Send(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// A fragment was buffered and acknowledged.
    Fragment,
    /// Same identifier as the previous request; the codec was not called.
    Ignore,
    Complete(ProcessResult),
}

pub struct Pump {
    codec: Box<dyn WscCodec>,
    reassembler: Reassembler,
    current_identifier: Option<u8>,
    own_mac: MacAddr,
    peer: Option<MacAddr>,
    identity: String,
    link: Arc<dyn EapolSender>,
}

impl Pump {
    pub fn new(
        codec: Box<dyn WscCodec>,
        own_mac: MacAddr,
        identity: String,
        link: Arc<dyn EapolSender>,
    ) -> Self {
        Pump {
            codec,
            reassembler: Reassembler::new(),
            current_identifier: None,
            own_mac,
            peer: None,
            identity,
            link,
        }
    }

    /// Binds outbound frames to the registrar picked by discovery.
    pub fn attach(&mut self, peer: MacAddr) {
        self.peer = Some(peer);
    }

    pub fn wsc_ies(&self) -> WscIes {
        WscIes {
            probe_request: self.codec.build_probe_request_ie(),
            assoc_request: self.codec.build_assoc_request_ie(),
        }
    }

    pub fn codec_finished(&self) -> bool {
        self.codec.is_finished()
    }

    pub fn take_credentials(&mut self) -> Vec<CredentialOffer> {
        self.codec.take_credentials()
    }

    pub async fn on_expanded_request(
        &mut self,
        identifier: u8,
        frame: &WscFrame<'_>,
    ) -> Result<PumpOutcome, PumpError> {
        if self.current_identifier == Some(identifier) {
            debug!("Ignoring repeated EAP-WSC request id {}", identifier);
            return Ok(PumpOutcome::Ignore);
        }
        self.current_identifier = Some(identifier);

        match self.reassembler.push(frame)? {
            Reassembly::NeedMore => {
                debug!(
                    "Buffered {:?} fragment, {} bytes so far",
                    frame.opcode,
                    self.reassembler.accumulated()
                );
                self.send_frag_ack(identifier).await?;
                Ok(PumpOutcome::Fragment)
            }
            Reassembly::Complete { opcode, message } => {
                let result = self.codec.process_message(opcode, &message);
                debug!("Codec returned {:?} for {:?} ({} bytes)", result, opcode, message.len());
                Ok(PumpOutcome::Complete(result))
            }
        }
    }

    pub async fn send_next_response(&mut self, identifier: u8) -> Result<(), PumpError> {
        let (opcode, message) = self.codec.next_message().ok_or(PumpError::NoResponse)?;
        debug!("Sending WSC {:?} ({} bytes) id {}", opcode, message.len(), identifier);
        self.send_eap(&create_wsc_response(identifier, opcode, &message)).await
    }

    pub async fn send_frag_ack(&self, identifier: u8) -> Result<(), PumpError> {
        self.send_eap(&create_frag_ack(identifier)).await
    }

    pub async fn send_identity(&self, identifier: u8) -> Result<(), PumpError> {
        info!("Answering identity request {} as {}", identifier, self.identity);
        self.send_eap(&create_identity_response(identifier, &self.identity)).await
    }

    pub async fn send_eapol_start(&self) -> Result<(), PumpError> {
        self.transmit(&build_eapol_start()).await
    }

    async fn send_eap(&self, packet: &EapPacket) -> Result<(), PumpError> {
        self.transmit(&build_eapol(EapolType::Eap, &packet.to_bytes())).await
    }

    async fn transmit(&self, frame: &[u8]) -> Result<(), PumpError> {
        let peer = self.peer.ok_or(PumpError::NotAttached)?;
        self.link
            .send_eapol(self.own_mac, peer, ETH_P_EAPOL, frame)
            .await
            .map_err(|e| {
                warn!("EAPOL send to {} failed: {}", peer, e);
                PumpError::Send(e)
            })
    }
}
