use super::types::{FilterCriterion, ResourceName};
use crate::common::ProviderError;
use crate::provider::ResourceProvider;
use std::sync::Arc;

/// Result of listing resources: the unfiltered total plus the matching names
/// in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub total_listed: usize,
    pub matched: Vec<ResourceName>,
}

/// Queries the provider for every resource and keeps the names matching the
/// filter.
///
/// The provider's list call is assumed not to support the filter natively, so
/// matching always happens client-side after a full listing.
pub struct ResourceLister {
    provider: Arc<dyn ResourceProvider>,
}

impl ResourceLister {
    pub fn new(provider: Arc<dyn ResourceProvider>) -> Self {
        Self { provider }
    }

    pub async fn list(&self, filter: &FilterCriterion) -> Result<Listing, ProviderError> {
        log::info!(
            "Scanning {} for resources matching '{}'",
            self.provider.describe(),
            filter
        );

        let all = self.provider.list_all().await.map_err(|e| {
            log::error!("Listing resources from {} failed: {e}", self.provider.describe());
            e
        })?;

        let total_listed = all.len();
        let matched = apply_filter(all, filter);

        log::info!(
            "Found {} matching resources out of {} listed",
            matched.len(),
            total_listed
        );

        Ok(Listing {
            total_listed,
            matched,
        })
    }
}

/// Keep the names matching `filter`, preserving order
pub fn apply_filter(names: Vec<ResourceName>, filter: &FilterCriterion) -> Vec<ResourceName> {
    names
        .into_iter()
        .filter(|name| filter.matches(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ProviderErrorKind;
    use crate::provider::InMemoryProvider;

    #[tokio::test]
    async fn list_keeps_matches_in_order() {
        let provider = Arc::new(InMemoryProvider::new([
            "/aws/lambda/LMA-one",
            "/aws/lambda/keep",
            "/aws/ecs/lma-two",
        ]));
        let lister = ResourceLister::new(provider);

        let listing = lister
            .list(&FilterCriterion::new("LMA").unwrap())
            .await
            .unwrap();

        assert_eq!(listing.total_listed, 3);
        assert_eq!(
            listing.matched,
            vec![
                ResourceName::from("/aws/lambda/LMA-one"),
                ResourceName::from("/aws/ecs/lma-two")
            ]
        );
    }

    #[tokio::test]
    async fn list_propagates_provider_failure() {
        let provider = Arc::new(
            InMemoryProvider::new(["a"]).fail_listing_with(ProviderError::transport("connection reset")),
        );
        let lister = ResourceLister::new(provider);

        let error = lister
            .list(&FilterCriterion::new("a").unwrap())
            .await
            .unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::Transport);
    }

    #[test]
    fn duplicates_are_kept() {
        let filter = FilterCriterion::new("x").unwrap();
        let names = vec!["x1".into(), "x1".into(), "y".into()];
        assert_eq!(apply_filter(names, &filter).len(), 2);
    }
}
