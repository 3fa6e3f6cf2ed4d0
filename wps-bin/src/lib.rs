pub mod config;
pub mod discovery;
pub mod machine;
pub mod pump;
pub mod runloop;
pub mod timer;

use pnet_base::MacAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use wps_core::device::generate_pin;
use wps_core::{
    CodecFactory, CodecParams, DeviceInfo, EapolSender, EnrolleeConfig, EventCallback, Method,
    Session, SessionEvent, WifiManager, WifiState,
};

use crate::pump::Pump;
use crate::runloop::RunLoop;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("a WPS session is already active")]
    DuplicateSession,
    #[error("Wi-Fi station is not idle ({0:?})")]
    WrongWifiState(WifiState),
    #[error("could not allocate session resources")]
    OutOfMemory,
    #[error("WPS method is disabled")]
    MethodDisabled,
    #[error("Wi-Fi driver error: {0:#}")]
    Driver(anyhow::Error),
}

enum Slot {
    Idle,
    /// Checks in `start()` are still running.
    Starting,
    Running(mpsc::Sender<SessionEvent>),
}

/// Handle to the process-wide enrollee. Clones share the same session slot.
#[derive(Clone)]
pub struct Enrollee {
    wifi: Arc<dyn WifiManager>,
    link: Arc<dyn EapolSender>,
    codecs: Arc<dyn CodecFactory>,
    slot: Arc<Mutex<Slot>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the slot in `Starting` while `start()` runs its checks. Dropping it
/// uncommitted, on an error or when the caller abandons the future, frees
/// the slot again.
struct Reservation<'a> {
    slot: &'a Mutex<Slot>,
    committed: bool,
}

impl<'a> Reservation<'a> {
    fn take(slot: &'a Mutex<Slot>) -> Result<Self, StartError> {
        let mut guard = lock(slot);
        if !matches!(*guard, Slot::Idle) {
            warn!("Rejecting WPS start: a session is already active");
            return Err(StartError::DuplicateSession);
        }
        *guard = Slot::Starting;
        Ok(Reservation {
            slot,
            committed: false,
        })
    }

    fn commit(mut self, sender: mpsc::Sender<SessionEvent>) {
        *lock(self.slot) = Slot::Running(sender);
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("WPS start did not complete, releasing the session slot");
            *lock(self.slot) = Slot::Idle;
        }
    }
}

impl Enrollee {
    pub fn new(
        wifi: Arc<dyn WifiManager>,
        link: Arc<dyn EapolSender>,
        codecs: Arc<dyn CodecFactory>,
    ) -> Self {
        Enrollee {
            wifi,
            link,
            codecs,
            slot: Arc::new(Mutex::new(Slot::Idle)),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(*lock(&self.slot), Slot::Idle)
    }

    /// Starts an enrollment and returns once its task is running. The
    /// outcome is delivered through `on_event`, after teardown.
    pub async fn start(
        &self,
        config: EnrolleeConfig,
        on_event: EventCallback,
    ) -> Result<(), StartError> {
        if config.method == Method::Disabled {
            return Err(StartError::MethodDisabled);
        }
        let reservation = Reservation::take(&self.slot)?;
        let (runloop, sender) = self.prepare(config, on_event.clone()).await?;
        reservation.commit(sender);

        let slot = self.slot.clone();
        tokio::spawn(async move {
            let outcome = runloop.run().await;
            *lock(&slot) = Slot::Idle;
            on_event(outcome);
        });
        Ok(())
    }

    async fn prepare(
        &self,
        config: EnrolleeConfig,
        on_event: EventCallback,
    ) -> Result<(RunLoop, mpsc::Sender<SessionEvent>), StartError> {
        let state = self.wifi.state().await;
        if !state.is_idle() {
            warn!("Rejecting WPS start: Wi-Fi is {:?}", state);
            return Err(StartError::WrongWifiState(state));
        }
        if config.event_queue_depth == 0 {
            error!("Event queue depth must be at least 1");
            return Err(StartError::OutOfMemory);
        }

        let mac = self.wifi.own_mac().await.map_err(StartError::Driver)?;
        let device = DeviceInfo::new(mac, &config);
        let pin = match config.method {
            Method::Pin => Some(generate_pin(&mut rand::thread_rng())),
            _ => None,
        };
        let params = CodecParams {
            device: device.clone(),
            method: config.method,
            pin: pin.clone(),
        };
        let codec = self.codecs.create(&params).map_err(|e| {
            error!("WSC codec allocation failed: {:#}", e);
            StartError::OutOfMemory
        })?;

        let (sender, events) = mpsc::channel(config.event_queue_depth);
        let pump = Pump::new(codec, mac, config.identity.clone(), self.link.clone());
        let session = Session::new(config.method, device);
        info!("WPS {:?} session accepted for {}", config.method, mac);
        let runloop = RunLoop::new(
            config,
            session,
            pump,
            self.wifi.clone(),
            sender.clone(),
            events,
            on_event,
            pin,
        );
        Ok((runloop, sender))
    }

    /// Ends the active session with `Canceled`. No-op when idle.
    pub fn cancel(&self) {
        self.notify(SessionEvent::Cancel, true);
    }

    /// Hands a received EAPOL body to the session. The bytes are copied
    /// before this returns.
    pub fn rx_eapol(&self, src: MacAddr, payload: &[u8]) {
        self.notify(
            SessionEvent::Frame {
                src,
                payload: payload.to_vec(),
            },
            false,
        );
    }

    pub fn link_up(&self) {
        self.notify(SessionEvent::Associated, true);
    }

    pub fn link_down(&self) {
        self.notify(SessionEvent::Disconnected, true);
    }

    fn notify(&self, event: SessionEvent, critical: bool) {
        let sender = match &*lock(&self.slot) {
            Slot::Running(sender) => sender.clone(),
            _ => {
                debug!("No WPS session, dropping {:?}", event);
                return;
            }
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) if critical => {
                warn!("Session queue full, deferring {:?}", event);
                tokio::spawn(async move {
                    let _ = sender.send(event).await;
                });
            }
            Err(TrySendError::Full(event)) => warn!("Session queue full, dropping {:?}", event),
            Err(TrySendError::Closed(_)) => debug!("Session already finishing"),
        }
    }
}
