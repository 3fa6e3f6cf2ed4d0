use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use pnet_base::MacAddr;
use wps_core::{Method, ScanCandidate, Session, SessionStatus, Target, WifiManager};
use wps_net::ie::RegistrarState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiscoveryOutcome {
    #[error("more than one registrar is active")]
    SessionOverlap,
    #[error("no registrar found before the deadline")]
    Timeout,
    #[error("scan could not be started")]
    ScanError,
}

/// Whether `candidate` runs a registrar for the same method we use.
pub fn matches_selected_registrar(candidate: &ScanCandidate, method: Method) -> bool {
    if candidate.wsc_ie.is_empty() {
        return false;
    }
    let registrar = RegistrarState::parse(&candidate.wsc_ie);
    let selected = match method {
        Method::PushButton => registrar.is_push_button(),
        Method::Pin => registrar.is_pin(),
        Method::Disabled => false,
    };
    if selected && candidate.is_wep() {
        debug!("Skipping {}: WEP not supported in WPS", candidate.bssid);
        return false;
    }
    selected
}

/// Scans until exactly one matching registrar shows up in a round, two or
/// more do (overlap), or `deadline` passes.
pub async fn discover(
    wifi: &dyn WifiManager,
    session: &mut Session,
    channels: &[u8],
    deadline: Duration,
) -> Result<Target, DiscoveryOutcome> {
    session.status = SessionStatus::Scanning;
    let started = Instant::now();
    let mut round = 0u32;

    loop {
        round += 1;
        let candidates = wifi.scan(channels).await.map_err(|e| {
            error!("Scan round {} failed: {}", round, e);
            DiscoveryOutcome::ScanError
        })?;

        let mut seen: Vec<MacAddr> = Vec::new();
        let mut target: Option<&ScanCandidate> = None;
        for candidate in candidates
            .iter()
            .filter(|c| matches_selected_registrar(c, session.method))
        {
            if seen.contains(&candidate.bssid) {
                continue;
            }
            seen.push(candidate.bssid);
            if target.is_none() {
                target = Some(candidate);
            }
        }
        session.discover_count = seen.len();
        debug!(
            "Scan round {}: {} BSS, {} matching registrar(s)",
            round,
            candidates.len(),
            seen.len()
        );

        match (seen.len(), target) {
            (1, Some(found)) => {
                info!(
                    "Found registrar {} ({:?}) on channel {}",
                    found.bssid,
                    String::from_utf8_lossy(&found.ssid),
                    found.channel
                );
                session.status = SessionStatus::Pending;
                let target = Target {
                    ssid: found.ssid.clone(),
                    bssid: found.bssid,
                    channel: found.channel,
                };
                session.target = Some(target.clone());
                return Ok(target);
            }
            (0, _) => {}
            (n, _) => {
                warn!("Session overlap: {} registrars active", n);
                return Err(DiscoveryOutcome::SessionOverlap);
            }
        }

        if started.elapsed() >= deadline {
            info!("No registrar found after {} scan rounds", round);
            return Err(DiscoveryOutcome::Timeout);
        }
    }
}
