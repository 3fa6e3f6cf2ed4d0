use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wps_core::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    Deadline,
    SuccessDisconnect,
}

/// One-shot timers that post an event into the session queue. At most one
/// timer per purpose is armed; re-arming replaces the previous one.
pub struct Timers {
    events: mpsc::Sender<SessionEvent>,
    armed: HashMap<TimerPurpose, JoinHandle<()>>,
}

impl Timers {
    pub fn new(events: mpsc::Sender<SessionEvent>) -> Self {
        Timers {
            events,
            armed: HashMap::new(),
        }
    }

    pub fn arm(&mut self, purpose: TimerPurpose, after: Duration, event: SessionEvent) {
        self.cancel(purpose);
        debug!("Arming {:?} timer for {:?}", purpose, after);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if events.send(event).await.is_err() {
                warn!("{:?} timer fired after the session queue closed", purpose);
            }
        });
        self.armed.insert(purpose, handle);
    }

    pub fn cancel(&mut self, purpose: TimerPurpose) {
        if let Some(handle) = self.armed.remove(&purpose) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.armed.drain() {
            handle.abort();
        }
    }

    pub fn is_armed(&self, purpose: TimerPurpose) -> bool {
        self.armed.get(&purpose).map_or(false, |h| !h.is_finished())
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
