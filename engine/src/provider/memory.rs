use super::ResourceProvider;
use crate::cleanup::ResourceName;
use crate::common::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Provider backed by an in-process list of names.
///
/// Deleting a name removes it; deleting a name that is not present fails with
/// [`ProviderErrorKind::NotFound`]. Failures, panics and latency can be injected
/// per name, which makes it the rehearsal backend for the CLI (`--source file`)
/// and the test double for the engine.
///
/// # Examples
///
/// ```no_run
/// use engine::provider::InMemoryProvider;
/// use engine::common::ProviderErrorKind;
///
/// let provider = InMemoryProvider::new(["/aws/lambda/a", "/aws/lambda/b"])
///     .fail_deletion_of("/aws/lambda/b", ProviderErrorKind::PermissionDenied);
/// ```
#[derive(Debug)]
pub struct InMemoryProvider {
    label: String,
    resources: Mutex<Vec<ResourceName>>,
    failures: Mutex<HashMap<ResourceName, ProviderErrorKind>>,
    panics: Mutex<HashSet<ResourceName>>,
    list_failure: Mutex<Option<ProviderError>>,
    delete_latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delete_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryProvider {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ResourceName>,
    {
        Self {
            label: "in-memory".to_string(),
            resources: Mutex::new(names.into_iter().map(Into::into).collect()),
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            list_failure: Mutex::new(None),
            delete_latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Load names from a text file, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ResourceName::from)
            .collect::<Vec<_>>();

        log::debug!("Loaded {} names from {}", names.len(), path.display());
        Ok(Self::new(names).with_label(format!("file:{}", path.display())))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Make every delete call sleep for `latency` before completing
    pub fn with_delete_latency(mut self, latency: Duration) -> Self {
        self.delete_latency = latency;
        self
    }

    pub fn fail_deletion_of(self, name: impl Into<ResourceName>, kind: ProviderErrorKind) -> Self {
        lock(&self.failures).insert(name.into(), kind);
        self
    }

    pub fn panic_on_delete_of(self, name: impl Into<ResourceName>) -> Self {
        lock(&self.panics).insert(name.into());
        self
    }

    pub fn fail_listing_with(self, error: ProviderError) -> Self {
        *lock(&self.list_failure) = Some(error);
        self
    }

    /// Stop injecting deletion failures, e.g. to simulate a provider recovering
    /// between two runs
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Names that have not been deleted yet, in listing order
    pub fn remaining(&self) -> Vec<ResourceName> {
        lock(&self.resources).clone()
    }

    /// Highest number of delete calls observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, name: &ResourceName) -> Option<ProviderError> {
        lock(&self.failures).get(name).map(|kind| {
            ProviderError::new(*kind, format!("injected {kind} failure for {name}"))
        })
    }
}

#[async_trait]
impl ResourceProvider for InMemoryProvider {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn list_all(&self) -> Result<Vec<ResourceName>, ProviderError> {
        if let Some(error) = lock(&self.list_failure).clone() {
            return Err(error);
        }
        Ok(self.remaining())
    }

    async fn delete_one(&self, name: &ResourceName) -> Result<(), ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let should_panic = lock(&self.panics).contains(name);
        if should_panic {
            panic!("simulated provider panic while deleting {name}");
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlightGuard(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delete_latency.is_zero() {
            tokio::time::sleep(self.delete_latency).await;
        }

        if let Some(error) = self.injected_failure(name) {
            return Err(error);
        }

        let mut resources = lock(&self.resources);
        match resources.iter().position(|existing| existing == name) {
            Some(index) => {
                resources.remove(index);
                Ok(())
            }
            None => Err(ProviderError::not_found(format!(
                "resource {name} does not exist"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use std::io::Write;

    #[tokio::test]
    async fn delete_removes_name_and_second_delete_is_not_found() {
        let provider = InMemoryProvider::new(["a", "b"]);

        assert_ok!(provider.delete_one(&"a".into()).await);
        assert_eq!(provider.remaining(), vec![ResourceName::from("b")]);

        let error = assert_err!(provider.delete_one(&"a".into()).await);
        assert_eq!(error.kind, ProviderErrorKind::NotFound);
    }

    #[tokio::test]
    async fn injected_failure_keeps_resource() {
        let provider = InMemoryProvider::new(["a"]).fail_deletion_of("a", ProviderErrorKind::Throttled);

        let error = assert_err!(provider.delete_one(&"a".into()).await);
        assert_eq!(error.kind, ProviderErrorKind::Throttled);
        assert_eq!(provider.remaining().len(), 1);

        provider.clear_failures();
        assert_ok!(provider.delete_one(&"a".into()).await);
    }

    #[tokio::test]
    async fn listing_failure_is_returned() {
        let provider = InMemoryProvider::new(["a"])
            .fail_listing_with(ProviderError::permission_denied("no credentials"));

        let error = assert_err!(provider.list_all().await);
        assert_eq!(error.kind, ProviderErrorKind::PermissionDenied);
    }

    #[test]
    fn from_file_skips_blank_and_comment_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# captured listing\n/aws/lambda/a\n\n  /aws/lambda/b  ").unwrap();

        let provider = InMemoryProvider::from_file(file.path()).unwrap();
        assert_eq!(
            provider.remaining(),
            vec![ResourceName::from("/aws/lambda/a"), ResourceName::from("/aws/lambda/b")]
        );
        assert!(provider.describe().starts_with("file:"));
    }
}
