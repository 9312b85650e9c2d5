//! Scoped profiler control
//!
//! Slow-operation profiling is switched on only through a `ProfilingGuard`,
//! which remembers the level it found and puts it back on release.

use std::future::IntoFuture;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::engine::adapter::{MetricsSource, ProfilingLevel, ProfilingStatus, SourceResult};

pub struct ProfilingGuard {
    source: Arc<dyn MetricsSource>,
    previous: ProfilingStatus,
    changed: bool,
    released: bool,
}

impl ProfilingGuard {
    /// Enable slow-operation profiling at `slow_ms` unless the profiler is
    /// already on, in which case the guard leaves it untouched.
    pub async fn acquire(source: Arc<dyn MetricsSource>, slow_ms: u64) -> SourceResult<Self> {
        let previous = source.profiling_status().await?;
        let changed = previous.level == ProfilingLevel::Off;

        if changed {
            source.set_profiling(ProfilingLevel::SlowOnly, slow_ms).await?;
            info!(
                database = source.database_name(),
                slow_ms, "slow-operation profiling enabled"
            );
        } else {
            info!(
                database = source.database_name(),
                level = %previous.level,
                "profiling already active; leaving it as found"
            );
        }

        Ok(Self {
            source,
            previous,
            changed,
            released: false,
        })
    }

    /// Level found at acquisition
    pub fn previous(&self) -> ProfilingStatus {
        self.previous
    }

    /// Whether acquisition changed the server's level
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Restore the level found at acquisition
    pub async fn release(mut self) -> SourceResult<()> {
        self.released = true;
        if self.changed {
            self.source
                .set_profiling(self.previous.level, self.previous.slow_ms)
                .await?;
            info!(
                database = self.source.database_name(),
                level = %self.previous.level,
                "profiling level restored"
            );
        }
        Ok(())
    }
}

impl ProfilingGuard {
    /// Run `work` with the guard held, then release it whatever `work`
    /// returned. A failed restore is logged, never returned.
    pub async fn hold<F: IntoFuture>(self, work: F) -> F::Output {
        let output = work.await;
        let database = self.source.database_name().to_string();
        if let Err(e) = self.release().await {
            error!(%database, error = %e, "failed to restore profiling level");
        }
        output
    }
}

impl Drop for ProfilingGuard {
    fn drop(&mut self) {
        if self.released || !self.changed {
            return;
        }

        let source = Arc::clone(&self.source);
        let previous = self.previous;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("profiling guard dropped without release; restoring in background");
                handle.spawn(async move {
                    if let Err(e) = source.set_profiling(previous.level, previous.slow_ms).await {
                        error!(error = %e, "failed to restore profiling level");
                    }
                });
            }
            Err(_) => {
                error!(
                    level = %previous.level,
                    "profiling guard dropped outside a runtime; level not restored"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adapter::{MemorySource, SourceCall};

    #[tokio::test]
    async fn test_acquire_and_release_restores_off() {
        let memory = Arc::new(MemorySource::new("qms"));
        let source: Arc<dyn MetricsSource> = memory.clone();

        let guard = ProfilingGuard::acquire(source, 150).await.unwrap();
        assert!(guard.changed());
        assert_eq!(
            memory.current_profiling(),
            ProfilingStatus { level: ProfilingLevel::SlowOnly, slow_ms: 150 }
        );

        guard.release().await.unwrap();
        assert_eq!(memory.current_profiling().level, ProfilingLevel::Off);
        assert_eq!(memory.current_profiling().slow_ms, 100);
        assert_eq!(memory.profiling_writes(), 2);
    }

    #[tokio::test]
    async fn test_active_profiler_is_left_alone() {
        let memory = Arc::new(MemorySource::new("qms").with_profiling(ProfilingLevel::All, 20));
        let source: Arc<dyn MetricsSource> = memory.clone();

        let guard = ProfilingGuard::acquire(source, 100).await.unwrap();
        assert!(!guard.changed());
        guard.release().await.unwrap();

        assert_eq!(memory.profiling_writes(), 0);
        assert_eq!(memory.current_profiling().level, ProfilingLevel::All);
    }

    #[tokio::test]
    async fn test_dropped_guard_restores_in_background() {
        let memory = Arc::new(MemorySource::new("qms"));
        let source: Arc<dyn MetricsSource> = memory.clone();

        let guard = ProfilingGuard::acquire(source, 100).await.unwrap();
        drop(guard);
        tokio::task::yield_now().await;

        assert_eq!(memory.current_profiling().level, ProfilingLevel::Off);
    }

    #[tokio::test]
    async fn test_hold_releases_after_failed_work() {
        let memory = Arc::new(MemorySource::new("qms"));
        let source: Arc<dyn MetricsSource> = memory.clone();

        let guard = ProfilingGuard::acquire(source, 100).await.unwrap();
        let result = guard
            .hold(async { Err::<(), _>("failed to bind 127.0.0.1:54330") })
            .await;

        assert_eq!(result, Err("failed to bind 127.0.0.1:54330"));
        assert_eq!(memory.current_profiling().level, ProfilingLevel::Off);
        assert_eq!(memory.profiling_writes(), 2);
    }

    #[test]
    fn test_hold_restores_before_runtime_shutdown() {
        let memory = Arc::new(
            MemorySource::new("qms").with_profiling_ack_delay(std::time::Duration::from_millis(5)),
        );
        let source: Arc<dyn MetricsSource> = memory.clone();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(async move {
            let guard = ProfilingGuard::acquire(source, 100).await.unwrap();
            guard
                .hold(async { Err::<(), _>("failed to bind 127.0.0.1:54330") })
                .await
        });
        drop(runtime);

        assert!(result.is_err());
        assert_eq!(memory.current_profiling().level, ProfilingLevel::Off);
    }

    #[tokio::test]
    async fn test_acquire_fails_when_status_unreadable() {
        let source: Arc<dyn MetricsSource> =
            Arc::new(MemorySource::new("qms").failing(SourceCall::ProfilingStatus));
        assert!(ProfilingGuard::acquire(source, 100).await.is_err());
    }
}
