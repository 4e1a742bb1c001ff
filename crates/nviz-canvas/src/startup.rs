//! One-shot construction of the display engine.

use crate::error::{Result, SceneError};
use std::time::Duration;

/// Builds the engine on a blocking worker and waits at most `timeout` for it.
///
/// Native engine initialization may block for a while (context creation,
/// driver probing), so it never runs on the async executor itself. On timeout
/// the worker is left to finish in the background and its result is dropped.
pub async fn start_engine<E, F>(factory: F, timeout: Duration) -> Result<E>
where
    E: Send + 'static,
    F: FnOnce() -> Result<E> + Send + 'static,
{
    tracing::info!(timeout_ms = timeout.as_millis() as u64, "starting display engine");

    let handle = tokio::task::spawn_blocking(factory);
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(engine))) => {
            tracing::info!("display engine ready");
            Ok(engine)
        }
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "display engine failed to initialize");
            Err(e)
        }
        Ok(Err(join)) => {
            tracing::error!(error = %join, "display engine worker panicked");
            Err(SceneError::Startup(join.to_string()))
        }
        Err(_) => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "display engine not ready in time");
            Err(SceneError::StartupTimeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;

    #[tokio::test]
    async fn test_engine_starts_within_timeout() {
        let engine = start_engine(|| Ok(RecordingEngine::new()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let err = start_engine(
            || {
                std::thread::sleep(Duration::from_millis(500));
                Ok(RecordingEngine::new())
            },
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SceneError::StartupTimeout(_)));
    }

    #[tokio::test]
    async fn test_factory_error_is_returned() {
        let err = start_engine::<RecordingEngine, _>(
            || Err(SceneError::Startup("no GL context".into())),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SceneError::Startup(msg) if msg == "no GL context"));
    }
}
