use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::SharedState;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(1_000);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Poll the result storage forever, keeping the shared degraded flag in sync.
///
/// Healthy storage is checked every [`HEALTH_POLL_INTERVAL`]; while it fails
/// the delay between checks doubles up to [`MAX_BACKOFF`].
pub async fn run(state: SharedState) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match state.results().health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                backoff = INITIAL_BACKOFF;
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                if !state.is_degraded() {
                    warn!(error = %err, "storage health check failed; entering degraded mode");
                    state.update_degraded(true);
                } else {
                    warn!(
                        error = %err,
                        retry_in_ms = backoff.as_millis() as u64,
                        "storage still unavailable"
                    );
                }
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            blob::BlobStore,
            storage::{StorageError, StorageResult},
        },
        state::AppState,
    };

    #[derive(Default)]
    struct FlakyStore {
        down: Arc<AtomicBool>,
    }

    impl BlobStore for FlakyStore {
        fn get(&self, _key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
            Box::pin(async { Ok(None) })
        }

        fn put(&self, _key: &str, _bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let down = self.down.load(Ordering::SeqCst);
            Box::pin(async move {
                if down {
                    Err(StorageError::unavailable(
                        "health check failed".into(),
                        std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                    ))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_flag_follows_health_checks() {
        let store = FlakyStore::default();
        let down = store.down.clone();
        down.store(true, Ordering::SeqCst);
        let state = AppState::new(AppConfig::default(), Arc::new(store), "test");
        let mut watcher = state.degraded_watcher();

        let supervisor = tokio::spawn(run(state.clone()));

        watcher.changed().await.unwrap();
        assert!(*watcher.borrow_and_update());

        down.store(false, Ordering::SeqCst);
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        supervisor.abort();
    }
}
