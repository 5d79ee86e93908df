//! Folder-wide open and recount over a bounded worker pool.

use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::naming::NameResolver;
use crate::params::DetectionParams;
use crate::session::{DetectionSession, SessionError};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Cooperative stop flag, checked before each per-image unit starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct OpenReport {
    /// In completion order.
    pub sessions: Vec<DetectionSession>,
    pub failures: Vec<(PathBuf, SessionError)>,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct RecountReport {
    pub sessions: Vec<DetectionSession>,
    pub recounted: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: usize,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BatchRunner {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Opens and detects every image. `on_complete` sees each result as its
    /// worker finishes; a failed load does not stop the others.
    pub async fn open_all<F>(
        &self,
        paths: Vec<PathBuf>,
        params: &DetectionParams,
        resolver: &NameResolver,
        cancel: &CancelToken,
        mut on_complete: F,
    ) -> OpenReport
    where
        F: FnMut(&Path, &Result<DetectionSession, SessionError>),
    {
        let total = paths.len();
        let mut results = stream::iter(paths.into_iter().map(|path| {
            let params = params.clone();
            let resolver = resolver.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let task_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    DetectionSession::open(&task_path, &params, resolver)
                })
                .await;
                Some((path, joined.unwrap_or_else(|e| Err(e.into()))))
            }
        }))
        .buffer_unordered(self.concurrency);

        let mut report = OpenReport::default();
        while let Some(item) = results.next().await {
            let Some((path, result)) = item else {
                report.skipped += 1;
                continue;
            };
            on_complete(&path, &result);
            match result {
                Ok(session) => report.sessions.push(session),
                Err(e) => {
                    warn!("failed to open {}: {e}", path.display());
                    report.failures.push((path, e));
                }
            }
        }
        info!(
            "opened {} of {} images ({} failed, {} cancelled)",
            report.sessions.len(),
            total,
            report.failures.len(),
            report.skipped
        );
        report
    }

    /// Re-runs detection on every session under `params`. Sessions reached
    /// after cancellation come back untouched.
    pub async fn recount_all<F>(
        &self,
        sessions: Vec<DetectionSession>,
        params: &DetectionParams,
        cancel: &CancelToken,
        mut on_complete: F,
    ) -> RecountReport
    where
        F: FnMut(&DetectionSession),
    {
        let mut results = stream::iter(sessions.into_iter().map(|mut session| {
            let params = params.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Ok((session, false));
                }
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = session.recount(&params) {
                        warn!("recount failed for {}: {e}", session.path().display());
                    }
                    (session, true)
                })
                .await
            }
        }))
        .buffer_unordered(self.concurrency);

        let mut report = RecountReport::default();
        while let Some(item) = results.next().await {
            match item {
                Ok((session, true)) => {
                    on_complete(&session);
                    report.recounted += 1;
                    report.sessions.push(session);
                }
                Ok((session, false)) => {
                    report.skipped += 1;
                    report.sessions.push(session);
                }
                // the session moved into a panicked worker is gone
                Err(e) => warn!("recount worker failed: {e}"),
            }
        }
        info!(
            "recounted {} sessions ({} skipped)",
            report.recounted, report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(BatchRunner::new(0).concurrency(), 1);
        assert_eq!(BatchRunner::default().concurrency(), DEFAULT_CONCURRENCY);
    }
}
