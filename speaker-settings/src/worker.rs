//! Debounced settings writer
//!
//! Bursts of control changes (someone sweeping the volume) collapse into one
//! write once the settings have been quiet for the debounce period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use speaker_dsp::{PersistedSettings, SettingsEvent};
use tracing::{debug, error, info};

use crate::store::SettingsStore;

/// Quiet period before a change is written
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1500);

/// How often an idle worker checks the shutdown flag
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Background thread writing settings changes to a [`SettingsStore`]
///
/// Dropping the worker flushes any pending change before returning.
pub struct SaveWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    pub fn spawn(store: SettingsStore, events: Receiver<SettingsEvent>) -> Self {
        Self::with_debounce(store, events, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(
        store: SettingsStore,
        events: Receiver<SettingsEvent>,
        debounce: Duration,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();

        let handle = thread::Builder::new()
            .name("settings-save".into())
            .spawn(move || run(store, events, debounce, shutdown_worker))
            .map_err(|e| error!("Failed to spawn settings worker: {}", e))
            .ok();

        Self { shutdown, handle }
    }

    /// Stop the worker, writing any pending change first
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    store: SettingsStore,
    events: Receiver<SettingsEvent>,
    debounce: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut pending: Option<(PersistedSettings, Instant)> = None;

    while !shutdown.load(Ordering::Relaxed) {
        let timeout = match &pending {
            Some((_, since)) => debounce.saturating_sub(since.elapsed()).min(IDLE_POLL),
            None => IDLE_POLL,
        };

        match events.recv_timeout(timeout) {
            Ok(SettingsEvent::Changed(settings)) => {
                debug!("Settings change pending");
                pending = Some((settings, Instant::now()));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some((settings, since)) = pending {
            if since.elapsed() >= debounce {
                write(&store, &settings);
                pending = None;
            }
        }
    }

    // Flush, including anything still queued
    for event in events.try_iter() {
        match event {
            SettingsEvent::Changed(settings) => pending = Some((settings, Instant::now())),
        }
    }
    if let Some((settings, _)) = pending {
        write(&store, &settings);
    }
}

fn write(store: &SettingsStore, settings: &PersistedSettings) {
    match store.save(settings) {
        Ok(()) => info!(path = %store.path().display(), "Settings saved"),
        Err(e) => error!(path = %store.path().display(), error = %e, "Failed to save settings"),
    }
}
