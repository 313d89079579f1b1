use engine::cleanup::{
    CleanupConfig, FilterCriterion, MemorySink, ResourceName, Sweeper, apply_filter, partition,
};
use engine::common::ProviderErrorKind;
use engine::provider::InMemoryProvider;
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[cfg(test)]
mod filter_property_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_filter_inclusion_is_exact_and_case_insensitive(
            names in prop::collection::vec("[a-zA-Z0-9/_-]{0,16}", 0..60),
            needle in "[a-zA-Z]{1,3}"
        ) {
            let filter = FilterCriterion::new(needle.clone()).unwrap();
            let input: Vec<ResourceName> = names.iter().map(|n| n.as_str().into()).collect();

            let matched = apply_filter(input.clone(), &filter);

            // Property: exactly the names containing the needle (ignoring case) survive, in order
            let expected: Vec<ResourceName> = input
                .iter()
                .filter(|n| n.as_str().to_lowercase().contains(&needle.to_lowercase()))
                .cloned()
                .collect();
            prop_assert_eq!(matched, expected);
        }

        #[test]
        fn test_filter_ignores_case_of_needle(
            name in "[a-z]{1,12}",
        ) {
            let upper = FilterCriterion::new(name.to_uppercase()).unwrap();
            prop_assert!(upper.matches(&ResourceName::from(name.as_str())));
        }
    }
}

#[cfg(test)]
mod partition_property_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_partition_is_exhaustive_and_ordered(
            count in 0usize..400,
            size in 1usize..80
        ) {
            let names: Vec<ResourceName> = (0..count).map(|i| format!("r{i}").into()).collect();

            let batches = partition(names.clone(), size).unwrap();

            // Property: concatenating batches reproduces the input exactly
            let rejoined: Vec<ResourceName> = batches.iter().flat_map(|b| b.names().to_vec()).collect();
            prop_assert_eq!(&rejoined, &names);

            // Property: no batch is empty or larger than the batch size
            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));

            // Property: batch numbering is 1..=N with a shared total
            prop_assert_eq!(batches.len(), count.div_ceil(size));
            for (index, batch) in batches.iter().enumerate() {
                prop_assert_eq!(batch.number(), index + 1);
                prop_assert_eq!(batch.total(), batches.len());
            }
        }
    }
}

#[cfg(test)]
mod outcome_property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_outcome_counts_reconcile_under_failure_injection(
            count in 0usize..120,
            failing in prop::collection::hash_set(0usize..120, 0..30),
            batch_size in 1usize..40,
            concurrency in 1usize..12
        ) {
            let names: Vec<String> = (0..count).map(|i| format!("LMA-{i}")).collect();
            let mut provider = InMemoryProvider::new(names.clone());
            let mut expected_failures = 0;
            for index in failing.iter().filter(|i| **i < count) {
                provider = provider.fail_deletion_of(names[*index].as_str(), ProviderErrorKind::Other);
                expected_failures += 1;
            }
            let provider = Arc::new(provider);

            let config = CleanupConfig::default()
                .with_batch_size(batch_size)
                .with_concurrency_limit(concurrency)
                .with_batch_pause_ms(0);
            let sweeper = Sweeper::new(provider.clone(), config)
                .unwrap()
                .with_sink(Arc::new(MemorySink::default()));

            let summary = runtime()
                .block_on(sweeper.run(&FilterCriterion::new("lma").unwrap()))
                .unwrap();

            // Property: every discovered resource was dispatched exactly once
            prop_assert_eq!(summary.total_discovered, count);
            prop_assert_eq!(summary.total_attempted, count);
            prop_assert_eq!(provider.delete_calls(), count);

            // Property: succeeded + failed == dispatched, failures named individually
            prop_assert_eq!(summary.succeeded + summary.failed, summary.total_attempted);
            prop_assert_eq!(summary.failed, expected_failures);
            prop_assert!(summary.reconciles());

            // Property: the resources left behind are exactly the failed ones
            let mut remaining = provider.remaining();
            let mut failed = summary.failed_names();
            remaining.sort();
            failed.sort();
            prop_assert_eq!(remaining, failed);
        }
    }
}
