use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::connectivity::{with_timeout, ConnectivityEvent, ConnectivityManager, Mode, ProbeReport};
use crate::api::VenueClient;

/// Background reconnection probing
///
/// Wakes every `interval` and probes the venue only while the manager reports
/// OFFLINE. Outcomes are posted to the manager's channel; the task never
/// touches connection state itself. Ends when the manager is dropped.
pub fn spawn_reconnect_task(
    venue: Arc<dyn VenueClient>,
    mut mode_rx: watch::Receiver<Mode>,
    reports: mpsc::Sender<ProbeReport>,
    interval: Duration,
    probe_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        // A late tick pushes the schedule back instead of bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Reconnection task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = reports.closed() => break,
            }

            if *mode_rx.borrow_and_update() == Mode::Online {
                continue;
            }

            info!("Probing venue for reconnection");
            let started = ProbeReport {
                event: ConnectivityEvent::ProbeStarted,
                at: Utc::now(),
            };
            if reports.send(started).await.is_err() {
                break;
            }

            let event = match with_timeout(probe_timeout, "reconnection probe", venue.probe()).await {
                Ok(()) => ConnectivityEvent::ProbeSucceeded,
                Err(e) => ConnectivityEvent::ProbeFailed(e),
            };
            debug!(?event, "Probe finished");

            if reports.send(ProbeReport { event, at: Utc::now() }).await.is_err() {
                break;
            }
        }

        info!("Reconnection task stopped");
    })
}

impl ConnectivityManager {
    /// Spawn the reconnection task wired to this manager
    pub fn spawn_reconnect_task(&self) -> JoinHandle<()> {
        spawn_reconnect_task(
            self.venue(),
            self.subscribe_mode(),
            self.probe_sender(),
            self.config().probe_interval(),
            self.config().probe_timeout(),
        )
    }
}
