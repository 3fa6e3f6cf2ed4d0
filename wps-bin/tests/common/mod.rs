#![allow(dead_code)]

use async_trait::async_trait;
use pnet_base::MacAddr;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use wps_bin::Enrollee;
use wps_core::{
    CodecFactory, CodecParams, ConnectRequest, CredentialOffer, EapolSender, EnrolleeConfig,
    EventCallback, Method, ProcessResult, ScanCandidate, WifiManager, WifiState, WpsEvent,
    WscCodec, WscIes,
};
use wps_net::eap::{EapCode, EapPacket};
use wps_net::eapol::{build_eapol, EapolType, ETH_P_EAPOL};
use wps_net::ie::{
    encode_attributes, ATTR_DEVICE_PASSWORD_ID, ATTR_SELECTED_REGISTRAR, DEV_PW_DEFAULT,
    DEV_PW_PUSHBUTTON,
};
use wps_net::wsc::build_wsc_packet;
use wps_net::{WscFlags, WscOpcode};

pub const OWN_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
pub const AP_MAC: MacAddr = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF);
pub const OTHER_AP_MAC: MacAddr = MacAddr(0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x00);
pub const THIRD_MAC: MacAddr = MacAddr(0x02, 0x11, 0x22, 0x33, 0x44, 0x55);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiCall {
    Scan,
    Connect(ConnectRequest),
    Disconnect,
    DisableStation,
    AutoReconnect(bool),
    WscIes(bool),
}

/// Scripted Wi-Fi layer. Scan rounds are consumed in order; once the script
/// runs out, `repeat` is returned for every further round.
pub struct MockWifi {
    state: Mutex<WifiState>,
    rounds: Mutex<VecDeque<anyhow::Result<Vec<ScanCandidate>>>>,
    repeat: Mutex<Vec<ScanCandidate>>,
    scan_delay: Duration,
    state_delay: Duration,
    associate_on_connect: bool,
    connected_at: Mutex<Option<Instant>>,
    calls: Mutex<Vec<WifiCall>>,
    enrollee: Mutex<Option<Enrollee>>,
}

impl MockWifi {
    pub fn new(repeat: Vec<ScanCandidate>) -> Self {
        MockWifi {
            state: Mutex::new(WifiState::Idle),
            rounds: Mutex::new(VecDeque::new()),
            repeat: Mutex::new(repeat),
            scan_delay: Duration::from_secs(2),
            state_delay: Duration::ZERO,
            associate_on_connect: true,
            connected_at: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            enrollee: Mutex::new(None),
        }
    }

    pub fn with_state(self, state: WifiState) -> Self {
        *self.state.lock().unwrap() = state;
        self
    }

    pub fn with_round(self, round: anyhow::Result<Vec<ScanCandidate>>) -> Self {
        self.rounds.lock().unwrap().push_back(round);
        self
    }

    pub fn without_link_up(mut self) -> Self {
        self.associate_on_connect = false;
        self
    }

    /// Makes every state query take `delay`, like a driver behind a slow bus.
    pub fn with_state_delay(mut self, delay: Duration) -> Self {
        self.state_delay = delay;
        self
    }

    /// When the most recent connect request was made.
    pub fn connected_at(&self) -> Option<Instant> {
        *self.connected_at.lock().unwrap()
    }

    /// Link notifications are delivered to `enrollee`, as a driver would.
    pub fn attach(&self, enrollee: &Enrollee) {
        *self.enrollee.lock().unwrap() = Some(enrollee.clone());
    }

    pub fn calls(&self) -> Vec<WifiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &WifiCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: WifiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn enrollee(&self) -> Option<Enrollee> {
        self.enrollee.lock().unwrap().clone()
    }
}

#[async_trait]
impl WifiManager for MockWifi {
    async fn own_mac(&self) -> anyhow::Result<MacAddr> {
        Ok(OWN_MAC)
    }

    async fn state(&self) -> WifiState {
        if !self.state_delay.is_zero() {
            tokio::time::sleep(self.state_delay).await;
        }
        *self.state.lock().unwrap()
    }

    async fn scan(&self, _channels: &[u8]) -> anyhow::Result<Vec<ScanCandidate>> {
        self.record(WifiCall::Scan);
        tokio::time::sleep(self.scan_delay).await;
        let scripted = self.rounds.lock().unwrap().pop_front();
        match scripted {
            Some(round) => round,
            None => Ok(self.repeat.lock().unwrap().clone()),
        }
    }

    async fn connect(&self, request: &ConnectRequest) -> anyhow::Result<()> {
        self.record(WifiCall::Connect(request.clone()));
        *self.connected_at.lock().unwrap() = Some(Instant::now());
        *self.state.lock().unwrap() = WifiState::Connected;
        if self.associate_on_connect {
            if let Some(enrollee) = self.enrollee() {
                enrollee.link_up();
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.record(WifiCall::Disconnect);
        *self.state.lock().unwrap() = WifiState::Idle;
        if let Some(enrollee) = self.enrollee() {
            enrollee.link_down();
        }
        Ok(())
    }

    async fn disable_station(&self) -> anyhow::Result<()> {
        self.record(WifiCall::DisableStation);
        *self.state.lock().unwrap() = WifiState::Idle;
        Ok(())
    }

    async fn set_auto_reconnect(&self, enabled: bool) -> anyhow::Result<()> {
        self.record(WifiCall::AutoReconnect(enabled));
        Ok(())
    }

    async fn set_wsc_ies(&self, ies: Option<WscIes>) -> anyhow::Result<()> {
        self.record(WifiCall::WscIes(ies.is_some()));
        Ok(())
    }
}

/// Captures every EAPOL frame the enrollee transmits.
pub struct MockLink {
    sent: Mutex<Vec<(MacAddr, Vec<u8>)>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl MockLink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = MockLink {
            sent: Mutex::new(Vec::new()),
            tx,
        };
        (Arc::new(link), rx)
    }

    pub fn sent(&self) -> Vec<(MacAddr, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EapolSender for MockLink {
    async fn send_eapol(
        &self,
        src: MacAddr,
        dst: MacAddr,
        ethertype: u16,
        payload: &[u8],
    ) -> anyhow::Result<()> {
        assert_eq!(src, OWN_MAC);
        assert_eq!(ethertype, ETH_P_EAPOL);
        self.sent.lock().unwrap().push((dst, payload.to_vec()));
        let _ = self.tx.send(payload.to_vec());
        Ok(())
    }
}

/// One registrar message as the codec sees it: what to return, what to
/// queue as the reply, and which credentials become available.
pub struct Step {
    pub result: ProcessResult,
    pub reply: Option<(WscOpcode, Vec<u8>)>,
    pub credentials: Vec<CredentialOffer>,
}

impl Step {
    pub fn reply(opcode: WscOpcode, body: &[u8]) -> Self {
        Step {
            result: ProcessResult::Continue,
            reply: Some((opcode, body.to_vec())),
            credentials: Vec::new(),
        }
    }
}

pub struct ScriptedCodec {
    steps: VecDeque<Step>,
    reply: Option<(WscOpcode, Vec<u8>)>,
    credentials: Vec<CredentialOffer>,
    finished: bool,
    received: Arc<Mutex<Vec<(WscOpcode, Vec<u8>)>>>,
}

impl WscCodec for ScriptedCodec {
    fn build_probe_request_ie(&self) -> Vec<u8> {
        vec![0x10, 0x4A, 0x00, 0x01, 0x10]
    }

    fn build_assoc_request_ie(&self) -> Vec<u8> {
        vec![0x10, 0x4A, 0x00, 0x01, 0x10]
    }

    fn process_message(&mut self, opcode: WscOpcode, message: &[u8]) -> ProcessResult {
        self.received.lock().unwrap().push((opcode, message.to_vec()));
        match self.steps.pop_front() {
            Some(step) => {
                self.reply = step.reply;
                self.credentials.extend(step.credentials);
                if step.result == ProcessResult::Done {
                    self.finished = true;
                }
                step.result
            }
            None => ProcessResult::Ignore,
        }
    }

    fn next_message(&mut self) -> Option<(WscOpcode, Vec<u8>)> {
        self.reply.take()
    }

    fn take_credentials(&mut self) -> Vec<CredentialOffer> {
        std::mem::take(&mut self.credentials)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[derive(Default)]
pub struct MockCodecFactory {
    pub fail: bool,
    steps: Mutex<Vec<Step>>,
    pub params: Mutex<Vec<CodecParams>>,
    pub received: Arc<Mutex<Vec<(WscOpcode, Vec<u8>)>>>,
}

impl MockCodecFactory {
    pub fn scripted(steps: Vec<Step>) -> Self {
        MockCodecFactory {
            steps: Mutex::new(steps),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        MockCodecFactory {
            fail: true,
            ..Default::default()
        }
    }
}

impl CodecFactory for MockCodecFactory {
    fn create(&self, params: &CodecParams) -> anyhow::Result<Box<dyn WscCodec>> {
        self.params.lock().unwrap().push(params.clone());
        if self.fail {
            anyhow::bail!("no memory for DH context");
        }
        Ok(Box::new(ScriptedCodec {
            steps: std::mem::take(&mut *self.steps.lock().unwrap()).into(),
            reply: None,
            credentials: Vec::new(),
            finished: false,
            received: self.received.clone(),
        }))
    }
}

/// M1..M8 compressed into two round trips: Start -> M1, then the final
/// registrar message delivers the credential and finishes the exchange.
pub fn pbc_exchange(ssid: &[u8], passphrase: &[u8]) -> Vec<Step> {
    vec![
        Step::reply(WscOpcode::Msg, b"M1"),
        Step {
            result: ProcessResult::Done,
            reply: Some((WscOpcode::Done, b"WSC_Done".to_vec())),
            credentials: vec![CredentialOffer {
                ssid: ssid.to_vec(),
                passphrase: passphrase.to_vec(),
                bssid: AP_MAC,
            }],
        },
    ]
}

pub fn registrar_ap(bssid: MacAddr, ssid: &[u8], password_id: u16) -> ScanCandidate {
    ScanCandidate {
        bssid,
        ssid: ssid.to_vec(),
        channel: 6,
        capability_info: 0x0411,
        has_rsn: true,
        wsc_ie: encode_attributes(&[
            (ATTR_SELECTED_REGISTRAR, &[1u8][..]),
            (ATTR_DEVICE_PASSWORD_ID, &password_id.to_be_bytes()[..]),
        ]),
    }
}

pub fn pbc_ap(bssid: MacAddr, ssid: &[u8]) -> ScanCandidate {
    registrar_ap(bssid, ssid, DEV_PW_PUSHBUTTON)
}

pub fn pin_ap(bssid: MacAddr, ssid: &[u8]) -> ScanCandidate {
    registrar_ap(bssid, ssid, DEV_PW_DEFAULT)
}

pub fn plain_ap(bssid: MacAddr, ssid: &[u8]) -> ScanCandidate {
    ScanCandidate {
        bssid,
        ssid: ssid.to_vec(),
        channel: 1,
        capability_info: 0x0411,
        has_rsn: true,
        wsc_ie: Vec::new(),
    }
}

// Registrar-side frame builders.

pub fn identity_request(id: u8) -> Vec<u8> {
    let packet = EapPacket {
        code: EapCode::Request,
        identifier: id,
        data: vec![1],
    };
    build_eapol(EapolType::Eap, &packet.to_bytes())
}

pub fn wsc_request(id: u8, opcode: WscOpcode, flags: u8, length: Option<u16>, data: &[u8]) -> Vec<u8> {
    let packet = build_wsc_packet(EapCode::Request, id, opcode, WscFlags(flags), length, data);
    build_eapol(EapolType::Eap, &packet.to_bytes())
}

pub fn eap_failure(id: u8) -> Vec<u8> {
    let packet = EapPacket {
        code: EapCode::Failure,
        identifier: id,
        data: Vec::new(),
    };
    build_eapol(EapolType::Eap, &packet.to_bytes())
}

/// What the enrollee put on the wire, decoded far enough for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    EapolStart,
    Identity { id: u8, identity: Vec<u8> },
    Wsc { id: u8, opcode: u8, data: Vec<u8> },
    Other(Vec<u8>),
}

pub fn classify(frame: &[u8]) -> Sent {
    if frame.len() == 4 && frame[1] == EapolType::Start as u8 {
        return Sent::EapolStart;
    }
    if frame.len() >= 9 && frame[1] == EapolType::Eap as u8 && frame[4] == EapCode::Response as u8 {
        let id = frame[5];
        match frame[8] {
            1 => {
                return Sent::Identity {
                    id,
                    identity: frame[9..].to_vec(),
                }
            }
            254 if frame.len() >= 18 => {
                return Sent::Wsc {
                    id,
                    opcode: frame[16],
                    data: frame[18..].to_vec(),
                }
            }
            _ => {}
        }
    }
    Sent::Other(frame.to_vec())
}

pub async fn next_sent(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Sent {
    let frame = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("enrollee sent nothing")
        .expect("link closed");
    classify(&frame)
}

/// Collects every callback; `next_outcome` skips the informational PIN.
pub struct Outcomes {
    rx: mpsc::UnboundedReceiver<WpsEvent>,
    pub all: Arc<Mutex<Vec<WpsEvent>>>,
}

impl Outcomes {
    pub async fn next_outcome(&mut self) -> WpsEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(600), self.rx.recv())
                .await
                .expect("no outcome delivered")
                .expect("callback dropped");
            if event.is_terminal() {
                return event;
            }
        }
    }

    pub async fn next_event(&mut self) -> WpsEvent {
        self.rx.recv().await.expect("callback dropped")
    }

    pub fn terminal_count(&self) -> usize {
        self.all.lock().unwrap().iter().filter(|e| e.is_terminal()).count()
    }
}

pub fn callback() -> (EventCallback, Outcomes) {
    callback_with(|_| {})
}

/// Like `callback`, running `inspect` inside the callback before recording.
pub fn callback_with<F>(inspect: F) -> (EventCallback, Outcomes)
where
    F: Fn(&WpsEvent) + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let all = Arc::new(Mutex::new(Vec::new()));
    let recorded = all.clone();
    let cb: EventCallback = Arc::new(move |event: WpsEvent| {
        inspect(&event);
        recorded.lock().unwrap().push(event.clone());
        let _ = tx.send(event);
    });
    (cb, Outcomes { rx, all })
}

pub struct Harness {
    pub enrollee: Enrollee,
    pub wifi: Arc<MockWifi>,
    pub link: Arc<MockLink>,
    pub frames: mpsc::UnboundedReceiver<Vec<u8>>,
    pub codecs: Arc<MockCodecFactory>,
}

impl Harness {
    pub fn new(wifi: MockWifi, codecs: MockCodecFactory) -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        let wifi = Arc::new(wifi);
        let (link, frames) = MockLink::new();
        let codecs = Arc::new(codecs);
        let enrollee = Enrollee::new(wifi.clone(), link.clone(), codecs.clone());
        wifi.attach(&enrollee);
        Harness {
            enrollee,
            wifi,
            link,
            frames,
            codecs,
        }
    }

    /// Registrar frame from the target AP.
    pub fn inject(&self, frame: Vec<u8>) {
        self.enrollee.rx_eapol(AP_MAC, &frame);
    }

    pub async fn next_sent(&mut self) -> Sent {
        next_sent(&mut self.frames).await
    }

    pub fn codec_received(&self) -> Vec<(WscOpcode, Vec<u8>)> {
        self.codecs.received.lock().unwrap().clone()
    }
}

pub fn config(method: Method) -> EnrolleeConfig {
    EnrolleeConfig::new(method)
}
