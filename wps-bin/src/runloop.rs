//! The task that owns one enrollment: it runs discovery, feeds queued
//! events through the [`Machine`] and carries out the transitions.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use wps_core::{
    ConnectRequest, EnrolleeConfig, EventCallback, ProcessResult, Session, SessionEvent,
    SessionStatus, WifiManager, WpsEvent,
};
use wps_net::{decode, Inbound};

use crate::discovery::discover;
use crate::machine::{Machine, Transition};
use crate::pump::{Pump, PumpError, PumpOutcome};
use crate::timer::{TimerPurpose, Timers};

pub struct RunLoop {
    config: EnrolleeConfig,
    session: Session,
    machine: Machine,
    pump: Pump,
    timers: Timers,
    wifi: Arc<dyn WifiManager>,
    events: mpsc::Receiver<SessionEvent>,
    /// Events raised while handling a frame, consumed before the queue.
    backlog: VecDeque<SessionEvent>,
    on_event: EventCallback,
    pin: Option<String>,
    offered: usize,
    torn_down: bool,
}

impl RunLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EnrolleeConfig,
        session: Session,
        pump: Pump,
        wifi: Arc<dyn WifiManager>,
        sender: mpsc::Sender<SessionEvent>,
        events: mpsc::Receiver<SessionEvent>,
        on_event: EventCallback,
        pin: Option<String>,
    ) -> Self {
        RunLoop {
            config,
            session,
            machine: Machine::new(),
            pump,
            timers: Timers::new(sender),
            wifi,
            events,
            backlog: VecDeque::new(),
            on_event,
            pin,
            offered: 0,
            torn_down: false,
        }
    }

    /// Runs the session to its outcome. Teardown has completed by the time
    /// this returns.
    pub async fn run(mut self) -> WpsEvent {
        let outcome = self.drive().await;
        self.teardown().await;
        outcome
    }

    async fn drive(&mut self) -> WpsEvent {
        info!(
            "Starting WPS {:?} session as {} (uuid {})",
            self.session.method, self.session.own_mac, self.session.device.uuid
        );
        if let Some(pin) = self.pin.clone() {
            (self.on_event)(WpsEvent::Pin(pin));
        }

        self.machine.configure();
        if let Err(e) = self.wifi.set_wsc_ies(Some(self.pump.wsc_ies())).await {
            error!("Failed to install WSC IEs: {:#}", e);
            return self.fail();
        }

        self.machine.begin_discovery();
        let channels = self.config.channels.clone();
        let window = self.config.discovery_timeout();
        let result = tokio::select! {
            result = discover(self.wifi.as_ref(), &mut self.session, &channels, window) => Some(result),
            _ = wait_for_cancel(&mut self.events) => None,
        };
        let Some(result) = result else {
            info!("WPS session canceled during discovery");
            return self.finish(SessionEvent::Cancel);
        };
        if let Transition::Finish(event) = self.machine.discovery_finished(&result) {
            return event;
        }
        let Ok(target) = result else {
            return self.fail();
        };

        self.pump.attach(target.bssid);
        if let Err(e) = self.wifi.set_auto_reconnect(false).await {
            warn!("Failed to disable auto-reconnect: {:#}", e);
        }
        let request = ConnectRequest {
            ssid: target.ssid.clone(),
            bssid: Some(target.bssid),
            channel: target.channel,
            suggested: true,
            validity: self.config.connect_validity(),
        };
        if let Err(e) = self.wifi.connect(&request).await {
            error!("Connecting to {} failed: {:#}", target.bssid, e);
            return self.fail();
        }
        let timeout = self.config.negotiation_timeout();
        self.session.arm_deadline(timeout);
        self.timers.arm(TimerPurpose::Deadline, timeout, SessionEvent::Timeout);

        loop {
            let event = match self.backlog.pop_front() {
                Some(event) => event,
                None => match self.events.recv().await {
                    Some(event) => event,
                    None => {
                        warn!("Event queue closed under a live session");
                        SessionEvent::Cancel
                    }
                },
            };

            if let SessionEvent::Frame { src, .. } = &event {
                if Some(*src) != self.session.target_bssid() {
                    debug!("Ignoring EAPOL frame from {}", src);
                    continue;
                }
            }

            match self.machine.step(&event) {
                Transition::Continue => {
                    if let SessionEvent::Frame { payload, .. } = &event {
                        self.handle_frame(payload).await;
                    }
                }
                Transition::SendEapolStart => {
                    info!("Associated with {}, sending EAPOL-Start", target.bssid);
                    if let Err(e) = self.pump.send_eapol_start().await {
                        self.protocol_error(e);
                    }
                }
                Transition::ArmDisconnectTimer => {
                    self.session.status = SessionStatus::Success;
                    self.timers.cancel(TimerPurpose::Deadline);
                    self.timers.arm(
                        TimerPurpose::SuccessDisconnect,
                        self.config.success_disconnect_delay(),
                        SessionEvent::DisconnectTimer,
                    );
                }
                Transition::Disconnect => self.disconnect_after_success().await,
                Transition::Finish(event) => return event,
            }
        }
    }

    async fn handle_frame(&mut self, payload: &[u8]) {
        let inbound = match decode(payload) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!("Dropping EAPOL frame: {}", e);
                return;
            }
        };
        match inbound {
            Inbound::IdentityRequest { identifier } => {
                if let Err(e) = self.pump.send_identity(identifier).await {
                    self.protocol_error(e);
                }
            }
            Inbound::Failure { identifier } => {
                if self.pump.codec_finished() {
                    debug!("EAP-Failure {} closes a finished exchange", identifier);
                    self.collect_credentials();
                    self.machine.mark_negotiation_finished();
                    self.backlog.push_back(SessionEvent::Success);
                } else {
                    warn!("Registrar aborted the exchange (EAP-Failure {})", identifier);
                    self.backlog.push_back(SessionEvent::Failure);
                }
            }
            Inbound::Wsc { identifier, frame } => {
                match self.pump.on_expanded_request(identifier, &frame).await {
                    Ok(PumpOutcome::Fragment) | Ok(PumpOutcome::Ignore) => {}
                    Ok(PumpOutcome::Complete(result)) => self.after_process(identifier, result).await,
                    Err(e) => self.protocol_error(e),
                }
            }
        }
    }

    async fn after_process(&mut self, identifier: u8, result: ProcessResult) {
        self.collect_credentials();
        match result {
            ProcessResult::Continue => {
                if let Err(e) = self.pump.send_next_response(identifier).await {
                    self.protocol_error(e);
                }
            }
            ProcessResult::Done => {
                match self.pump.send_next_response(identifier).await {
                    Ok(()) | Err(PumpError::NoResponse) => {}
                    Err(e) => warn!("Final WSC response not sent: {}", e),
                }
                info!("WSC registration finished, {} credential(s) offered", self.offered);
                self.machine.mark_negotiation_finished();
                self.backlog.push_back(SessionEvent::Success);
            }
            ProcessResult::Failure => {
                // The codec queues a NACK when it has one to send.
                match self.pump.send_next_response(identifier).await {
                    Ok(()) => debug!("Sent WSC NACK for request {}", identifier),
                    Err(e) => debug!("No NACK sent: {}", e),
                }
                warn!("WSC codec rejected request {}", identifier);
                self.backlog.push_back(SessionEvent::Failure);
            }
            ProcessResult::Fragment => {
                if let Err(e) = self.pump.send_frag_ack(identifier).await {
                    self.protocol_error(e);
                }
            }
            ProcessResult::Ignore => debug!("Codec ignored request {}", identifier),
        }
    }

    fn collect_credentials(&mut self) {
        for offer in self.pump.take_credentials() {
            self.machine
                .credentials_mut()
                .offer(self.offered, &offer.ssid, &offer.passphrase, offer.bssid);
            self.offered += 1;
        }
    }

    async fn disconnect_after_success(&mut self) {
        if !self.wifi.state().await.is_associated() {
            self.backlog.push_back(SessionEvent::Disconnected);
            return;
        }
        debug!("Dropping link to let the credential take effect");
        if let Err(e) = self.wifi.disconnect().await {
            warn!("Disconnect after success failed: {:#}", e);
            self.backlog.push_back(SessionEvent::Disconnected);
        }
    }

    fn protocol_error(&mut self, e: PumpError) {
        error!("WSC exchange failed: {}", e);
        self.backlog.push_back(SessionEvent::Failure);
    }

    fn fail(&mut self) -> WpsEvent {
        self.finish(SessionEvent::Failure)
    }

    fn finish(&mut self, event: SessionEvent) -> WpsEvent {
        match self.machine.step(&event) {
            Transition::Finish(outcome) => outcome,
            _ => WpsEvent::Failure,
        }
    }

    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!(
            "Tearing down WPS session: status {:?}, {} registrar(s) seen, deadline remaining {:?}",
            self.session.status,
            self.session.discover_count,
            self.session.remaining()
        );
        self.session.status = SessionStatus::DisableRequested;
        self.timers.cancel_all();

        if let Err(e) = self.wifi.set_wsc_ies(None).await {
            warn!("Failed to clear WSC IEs: {:#}", e);
        }
        let settle = self.config.settle_delay();
        if self.wifi.state().await.is_associated() {
            if let Err(e) = self.wifi.disconnect().await {
                warn!("Teardown disconnect failed: {:#}", e);
            }
            tokio::time::sleep(settle).await;
        }
        if let Err(e) = self.wifi.disable_station().await {
            warn!("Failed to disable station: {:#}", e);
        }
        tokio::time::sleep(settle).await;
        if let Err(e) = self.wifi.set_auto_reconnect(true).await {
            warn!("Failed to re-enable auto-reconnect: {:#}", e);
        }

        self.events.close();
        self.session.status = SessionStatus::Disabled;
        info!(
            "WPS session torn down in {:?} after {:?}",
            self.machine.phase(),
            self.session.start_time.elapsed()
        );
    }
}

/// Drains the queue until a cancel arrives. Nothing else is actionable
/// while scanning.
async fn wait_for_cancel(events: &mut mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        if event == SessionEvent::Cancel {
            return;
        }
        debug!("Dropping {:?} during discovery", event);
    }
    warn!("Event queue closed during discovery");
}
