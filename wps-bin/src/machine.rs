//! Session lifecycle as a pure state machine. The run-loop feeds it events
//! and carries out the returned [`Transition`]; nothing here blocks or does
//! I/O.

use tracing::{debug, info, warn};
use wps_core::{CredentialStore, SessionEvent, Target, WpsEvent};

use crate::discovery::DiscoveryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Configuring,
    Discovering,
    Associating,
    Negotiating,
    Completed,
    Failed,
    TimedOut,
    Overlap,
    Canceled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::Failed | Phase::TimedOut | Phase::Overlap | Phase::Canceled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Continue,
    SendEapolStart,
    ArmDisconnectTimer,
    Disconnect,
    /// Tear down, then deliver the event.
    Finish(WpsEvent),
}

#[derive(Debug)]
pub struct Machine {
    phase: Phase,
    success_pending: bool,
    negotiation_finished: bool,
    credentials: CredentialStore,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            phase: Phase::Idle,
            success_pending: false,
            negotiation_finished: false,
            credentials: CredentialStore::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialStore {
        &mut self.credentials
    }

    /// Records that the codec reached its terminal protocol state.
    pub fn mark_negotiation_finished(&mut self) {
        self.negotiation_finished = true;
    }

    fn enter(&mut self, next: Phase) {
        if self.phase != next {
            debug!("Enrollee {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    fn finish(&mut self, next: Phase, event: WpsEvent) -> Transition {
        info!("Enrollee session finished in {:?}", next);
        self.enter(next);
        Transition::Finish(event)
    }

    pub fn configure(&mut self) {
        self.enter(Phase::Configuring);
    }

    pub fn begin_discovery(&mut self) {
        self.enter(Phase::Discovering);
    }

    pub fn discovery_finished(&mut self, result: &Result<Target, DiscoveryOutcome>) -> Transition {
        match result {
            Ok(target) => {
                self.credentials.set_target(&target.ssid);
                self.enter(Phase::Associating);
                Transition::Continue
            }
            Err(DiscoveryOutcome::SessionOverlap) => {
                self.finish(Phase::Overlap, WpsEvent::SessionOverlap)
            }
            Err(DiscoveryOutcome::Timeout) => self.finish(Phase::TimedOut, WpsEvent::Timeout),
            Err(DiscoveryOutcome::ScanError) => self.finish(Phase::Failed, WpsEvent::ScanError),
        }
    }

    pub fn step(&mut self, event: &SessionEvent) -> Transition {
        if self.phase.is_terminal() {
            debug!("Ignoring {:?} after session end", event);
            return Transition::Continue;
        }

        match event {
            SessionEvent::Cancel => self.finish(Phase::Canceled, WpsEvent::Canceled),
            SessionEvent::Timeout if self.success_pending => {
                // Already queued when the deadline was disarmed.
                debug!("Deadline expired after success, waiting for disconnect");
                Transition::Continue
            }
            SessionEvent::Timeout => self.finish(Phase::TimedOut, WpsEvent::Timeout),
            SessionEvent::Failure => self.finish(Phase::Failed, WpsEvent::Failure),
            SessionEvent::Associated => {
                if self.phase == Phase::Associating {
                    self.enter(Phase::Negotiating);
                    Transition::SendEapolStart
                } else {
                    Transition::Continue
                }
            }
            SessionEvent::Frame { .. } => {
                // Some APs start EAP before the link-up notification lands.
                if self.phase == Phase::Associating {
                    self.enter(Phase::Negotiating);
                }
                Transition::Continue
            }
            SessionEvent::Success => {
                if self.phase == Phase::Negotiating && !self.success_pending {
                    self.success_pending = true;
                    Transition::ArmDisconnectTimer
                } else {
                    Transition::Continue
                }
            }
            SessionEvent::DisconnectTimer => {
                if self.success_pending {
                    Transition::Disconnect
                } else {
                    Transition::Continue
                }
            }
            SessionEvent::Disconnected => {
                if self.success_pending {
                    match (self.negotiation_finished, self.credentials.finalize()) {
                        (true, Some(credential)) => {
                            self.finish(Phase::Completed, WpsEvent::Complete(credential))
                        }
                        (finished, _) => {
                            warn!(
                                "Negotiation ended without a usable credential (finished: {}, accepted: {})",
                                finished,
                                self.credentials.accepted()
                            );
                            self.finish(Phase::Failed, WpsEvent::Failure)
                        }
                    }
                } else if matches!(self.phase, Phase::Associating | Phase::Negotiating) {
                    warn!("Link lost during {:?}", self.phase);
                    self.finish(Phase::Failed, WpsEvent::Failure)
                } else {
                    Transition::Continue
                }
            }
        }
    }
}
