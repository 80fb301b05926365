pub mod clock;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};

use crate::{
    config::AppConfig,
    dao::{blob::BlobStore, results::ResultRepository},
};

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 64;

/// Central application state: storage handle, configuration and broadcast hubs.
pub struct AppState {
    config: AppConfig,
    results: ResultRepository,
    storage_backend: &'static str,
    clock: Arc<dyn Clock>,
    sse: SseHub,
    write_gates: DashMap<String, Arc<Mutex<()>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The state starts healthy; the storage supervisor flips it to degraded
    /// when health checks fail.
    pub fn new(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        storage_backend: &'static str,
    ) -> SharedState {
        Self::with_clock(config, blobs, storage_backend, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit clock.
    pub fn with_clock(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        storage_backend: &'static str,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        let results = ResultRepository::new(blobs, &config.key_prefix);
        Arc::new(Self {
            config,
            results,
            storage_backend,
            clock,
            sse: SseHub::new(SSE_CAPACITY),
            write_gates: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Repository over the per-test-type result blobs.
    pub fn results(&self) -> &ResultRepository {
        &self.results
    }

    /// Name of the configured storage backend.
    pub fn storage_backend(&self) -> &'static str {
        self.storage_backend
    }

    /// Current wall-clock time in milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Serialize read-modify-write cycles on one test type within this process.
    ///
    /// Writers in other processes sharing the same blob are not covered:
    /// across processes the last writer wins.
    pub async fn lock_results(&self, test_type: &str) -> OwnedMutexGuard<()> {
        let gate = self
            .write_gates
            .entry(test_type.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        gate.lock_owned().await
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
