//! Property-based tests for photo listing.
//!
//! # Tested Invariants
//!
//! - Every window is a slice of one total order
//! - `total` is the true record count regardless of `limit`/`offset`
//! - `limit` is clamped to the maximum page size

use proptest::prelude::*;

use super::{MAX_PAGE_LIMIT, PhotoLibrary};
use crate::services::blob::BlobStore;
use crate::services::metadata::MetadataStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Strategy for an optional page limit, occasionally above the maximum.
fn limit_strategy() -> impl Strategy<Value = Option<usize>> {
    prop::option::of(0usize..700)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_windows_follow_single_order(
        count in 0usize..40,
        limit in limit_strategy(),
        offset in prop::option::of(0usize..60),
    ) {
        runtime().block_on(async {
            let library = PhotoLibrary::new(BlobStore::memory(), MetadataStore::memory());
            for n in 0..count {
                library.register(&format!("{n:03}.jpg")).await.unwrap();
            }

            let all = library.list_photos(Some(MAX_PAGE_LIMIT), Some(0)).await.unwrap();
            let page = library.list_photos(limit, offset).await.unwrap();

            let expected_limit = limit.unwrap_or(100).min(MAX_PAGE_LIMIT);
            let start = offset.unwrap_or(0).min(count);
            let end = (start + expected_limit).min(count);

            prop_assert_eq!(page.total, count);
            prop_assert_eq!(page.limit, expected_limit);
            prop_assert_eq!(&page.items[..], &all.items[start..end]);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
