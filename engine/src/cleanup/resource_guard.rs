use super::types::{Batch, ResourceName};
use std::collections::VecDeque;

/// Transient state of one run: the filtered listing and the batches still
/// waiting to be processed.
#[derive(Debug, Default)]
pub struct RunArtifacts {
    pub listing: Vec<ResourceName>,
    pub pending_batches: VecDeque<Batch>,
}

impl RunArtifacts {
    pub fn is_empty(&self) -> bool {
        self.listing.is_empty() && self.pending_batches.is_empty()
    }

    fn release(&mut self) -> (usize, usize) {
        let released = (self.listing.len(), self.pending_batches.len());
        self.listing.clear();
        self.pending_batches.clear();
        released
    }
}

/// Owns the run artifacts and releases them when dropped.
///
/// The guard is created before the provider is contacted, so every exit path
/// runs the teardown: normal completion, the "nothing to do" exit, a fatal
/// listing error, an operator declining the prompt, cancellation, or a panic
/// unwinding through the run.
pub struct ArtifactGuard {
    artifacts: Option<RunArtifacts>,
    cleanup_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl ArtifactGuard {
    /// Create a new guard with an optional cleanup function that runs after the
    /// artifacts are released
    pub fn new(cleanup_fn: Option<Box<dyn FnOnce() + Send>>) -> Self {
        Self {
            artifacts: Some(RunArtifacts::default()),
            cleanup_fn,
        }
    }

    pub fn get(&self) -> Option<&RunArtifacts> {
        self.artifacts.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut RunArtifacts> {
        self.artifacts.as_mut()
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if let Some(mut artifacts) = self.artifacts.take() {
            let (names, batches) = artifacts.release();
            log::debug!(
                "Teardown: released listing of {names} names and {batches} unprocessed batches"
            );
        }

        if let Some(cleanup) = self.cleanup_fn.take() {
            cleanup();
        }

        log::debug!("ArtifactGuard: teardown completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn cleanup_runs_on_drop() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        {
            let mut guard = ArtifactGuard::new(Some(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
            })));
            guard.get_mut().unwrap().listing.push("a".into());
            assert!(!guard.get().unwrap().is_empty());
        }

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn cleanup_runs_when_unwinding() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = ArtifactGuard::new(Some(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
            })));
            panic!("run aborted");
        });

        assert!(result.is_err());
        assert!(ran.load(Ordering::SeqCst));
    }
}
