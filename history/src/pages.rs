//! Fixed-size pages of an ordered collection, stored as hash groups.
//!
//! A collection saved under `(key, page_size)` lives in one hash group whose
//! fields are page numbers (`"1"`, `"2"`, ...) and whose values are JSON
//! arrays. The field count of the group is the total page count.

use std::time::Duration;

use fxhistory_common::{page_count, PaginationInfo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::error::{HistoryError, HistoryResult};
use crate::keys::{CacheKeyScheme, PageGroup};

/// One page of values with its position in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub values: Vec<T>,
    pub info: PaginationInfo,
}

/// Slice page `page_number` (1-based) out of an in-memory collection.
///
/// Returns `None` when the page does not exist.
pub fn slice_page<T: Clone>(values: &[T], page_size: u32, page_number: u32) -> Option<Page<T>> {
    if page_size == 0 || page_number == 0 {
        return None;
    }
    let total = page_count(values.len(), page_size as usize);
    if page_number as usize > total {
        return None;
    }

    let chunk = values.chunks(page_size as usize).nth(page_number as usize - 1)?;
    Some(Page {
        values: chunk.to_vec(),
        info: PaginationInfo {
            current_page_number: page_number,
            current_page_size: chunk.len() as u32,
            page_count_total: total as u32,
        },
    })
}

/// Stores and serves pages through a cache backend.
pub struct PageStore<'a> {
    backend: &'a dyn CacheBackend,
}

impl<'a> PageStore<'a> {
    pub fn new(backend: &'a dyn CacheBackend) -> Self {
        Self { backend }
    }

    /// Split `values` into pages of `page_size` and store them under `key`.
    ///
    /// The whole group is replaced and `ttl` applied to it. Returns the page
    /// count.
    pub async fn save<T: Serialize>(
        &self,
        key: &str,
        values: &[T],
        page_size: u32,
        ttl: Option<Duration>,
    ) -> HistoryResult<u32> {
        if page_size < 1 {
            return Err(HistoryError::InvalidPagination(
                "page size must be at least 1".to_string(),
            ));
        }
        self.save_group(key, values, page_size as usize, PageGroup::Size(page_size), ttl)
            .await
    }

    /// Store `values` as a single page in the whole-collection group.
    pub async fn save_all<T: Serialize>(
        &self,
        key: &str,
        values: &[T],
        ttl: Option<Duration>,
    ) -> HistoryResult<u32> {
        self.save_group(key, values, values.len(), PageGroup::All, ttl)
            .await
    }

    /// Fetch page `page_number` of the `(key, page_size)` group.
    ///
    /// `None` when the group is absent or the page number exceeds its page
    /// count; a present page is never empty.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        key: &str,
        page_size: u32,
        page_number: u32,
    ) -> HistoryResult<Option<Page<T>>> {
        if page_size < 1 {
            return Ok(None);
        }
        self.get_group_page(key, PageGroup::Size(page_size), page_number)
            .await
    }

    /// Fetch the whole-collection page stored by [`PageStore::save_all`].
    pub async fn get_all<T: DeserializeOwned>(&self, key: &str) -> HistoryResult<Option<Page<T>>> {
        self.get_group_page(key, PageGroup::All, 1).await
    }

    /// Stored page count of the `(key, page_size)` group, zero when absent.
    pub async fn page_count(&self, key: &str, page_size: u32) -> HistoryResult<u32> {
        let group = CacheKeyScheme::group_key(key, PageGroup::Size(page_size));
        Ok(self.backend.hash_field_count(&group).await? as u32)
    }

    async fn save_group<T: Serialize>(
        &self,
        key: &str,
        values: &[T],
        page_size: usize,
        group: PageGroup,
        ttl: Option<Duration>,
    ) -> HistoryResult<u32> {
        if values.is_empty() {
            return Err(HistoryError::InvalidPagination(
                "cannot page an empty collection".to_string(),
            ));
        }

        let fields = values
            .chunks(page_size)
            .enumerate()
            .map(|(i, page)| {
                serde_json::to_string(page)
                    .map(|json| ((i + 1).to_string(), json))
                    .map_err(|e| HistoryError::Serialization(e.to_string()))
            })
            .collect::<HistoryResult<Vec<_>>>()?;
        let pages = fields.len() as u32;

        let group_key = CacheKeyScheme::group_key(key, group);
        self.backend.hash_set_fields(&group_key, fields).await?;
        self.backend.set_group_expiry(&group_key, ttl).await?;

        debug!(group = %group_key, pages, "Saved page group");
        Ok(pages)
    }

    async fn get_group_page<T: DeserializeOwned>(
        &self,
        key: &str,
        group: PageGroup,
        page_number: u32,
    ) -> HistoryResult<Option<Page<T>>> {
        if page_number < 1 {
            return Ok(None);
        }

        let group_key = CacheKeyScheme::group_key(key, group);
        let Some(raw) = self
            .backend
            .hash_get_field(&group_key, &page_number.to_string())
            .await?
        else {
            return Ok(None);
        };

        let total = self.backend.hash_field_count(&group_key).await? as u32;
        if page_number > total {
            // Group rebuilt between the two reads.
            return Ok(None);
        }

        let values: Vec<T> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(group = %group_key, page = page_number, error = %e, "Corrupt page");
                return Ok(None);
            }
        };
        if values.is_empty() {
            return Ok(None);
        }

        Ok(Some(Page {
            info: PaginationInfo {
                current_page_number: page_number,
                current_page_size: values.len() as u32,
                page_count_total: total,
            },
            values,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use proptest::prelude::*;

    const KEY: &str = "test:USD:2024-01-01..2024-01-05";

    fn letters(n: usize) -> Vec<String> {
        (0..n).map(|i| ((b'A' + (i % 26) as u8) as char).to_string()).collect()
    }

    async fn read_all(store: &PageStore<'_>, page_size: u32) -> Vec<String> {
        let total = store.page_count(KEY, page_size).await.unwrap();
        let mut out = Vec::new();
        for p in 1..=total {
            let page: Page<String> = store.get_page(KEY, page_size, p).await.unwrap().unwrap();
            out.extend(page.values);
        }
        out
    }

    #[tokio::test]
    async fn test_five_values_page_size_two() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);
        let values = letters(5);

        let pages = store.save(KEY, &values, 2, None).await.unwrap();
        assert_eq!(pages, 3);

        let expected = [vec!["A", "B"], vec!["C", "D"], vec!["E"]];
        for (i, want) in expected.iter().enumerate() {
            let page: Page<String> = store
                .get_page(KEY, 2, i as u32 + 1)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&page.values, want);
            assert_eq!(page.info.page_count_total, 3);
            assert_eq!(page.info.current_page_number, i as u32 + 1);
            assert_eq!(page.info.current_page_size, want.len() as u32);
        }

        let beyond: Option<Page<String>> = store.get_page(KEY, 2, 4).await.unwrap();
        assert!(beyond.is_none());
    }

    #[tokio::test]
    async fn test_round_trip_boundary_counts() {
        let page_size = 4u32;
        for count in [1, 3, 4, 5, 8] {
            let backend = InMemoryBackend::new();
            let store = PageStore::new(&backend);
            let values = letters(count);

            let pages = store.save(KEY, &values, page_size, None).await.unwrap();

            assert_eq!(pages as usize, page_count(count, page_size as usize));
            assert_eq!(read_all(&store, page_size).await, values, "count {}", count);
        }
    }

    #[tokio::test]
    async fn test_absent_group() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);

        let page: Option<Page<String>> = store.get_page(KEY, 2, 1).await.unwrap();
        assert!(page.is_none());
        assert_eq!(store.page_count(KEY, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_page_sizes_are_separate_groups() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);
        let values = letters(6);

        store.save(KEY, &values, 2, None).await.unwrap();
        store.save(KEY, &values, 4, None).await.unwrap();

        assert_eq!(store.page_count(KEY, 2).await.unwrap(), 3);
        assert_eq!(store.page_count(KEY, 4).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_with_fewer_pages_drops_stale_pages() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);

        store.save(KEY, &letters(6), 2, None).await.unwrap();
        store.save(KEY, &letters(3), 2, None).await.unwrap();

        let stale: Option<Page<String>> = store.get_page(KEY, 2, 3).await.unwrap();
        assert!(stale.is_none());
        assert_eq!(read_all(&store, 2).await, letters(3));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_zero_size() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);

        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            store.save(KEY, &empty, 2, None).await,
            Err(HistoryError::InvalidPagination(_))
        ));
        assert!(matches!(
            store.save(KEY, &letters(2), 0, None).await,
            Err(HistoryError::InvalidPagination(_))
        ));
    }

    #[tokio::test]
    async fn test_save_all_single_page() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);
        let values = letters(7);

        assert_eq!(store.save_all(KEY, &values, None).await.unwrap(), 1);

        let page: Page<String> = store.get_all(KEY).await.unwrap().unwrap();
        assert_eq!(page.values, values);
        assert_eq!(page.info, PaginationInfo::single_page(7));
    }

    #[tokio::test]
    async fn test_group_ttl_applied() {
        let backend = InMemoryBackend::new();
        let store = PageStore::new(&backend);

        store
            .save(KEY, &letters(3), 2, Some(Duration::from_millis(30)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let page: Option<Page<String>> = store.get_page(KEY, 2, 1).await.unwrap();
        assert!(page.is_none());
    }

    #[test]
    fn test_slice_page() {
        let values = letters(5);

        let page = slice_page(&values, 2, 3).unwrap();
        assert_eq!(page.values, vec!["E".to_string()]);
        assert_eq!(page.info.page_count_total, 3);

        assert!(slice_page(&values, 2, 4).is_none());
        assert!(slice_page(&values, 2, 0).is_none());
        assert!(slice_page(&values, 0, 1).is_none());
    }

    proptest! {
        #[test]
        fn prop_slices_reassemble(count in 1usize..50, page_size in 1u32..12) {
            let values = letters(count);
            let total = page_count(count, page_size as usize) as u32;

            let mut out = Vec::new();
            for p in 1..=total {
                let page = slice_page(&values, page_size, p).unwrap();
                prop_assert!(!page.values.is_empty());
                prop_assert!(page.info.current_page_size <= page_size);
                out.extend(page.values);
            }

            prop_assert_eq!(out, values.clone());
            prop_assert!(slice_page(&values, page_size, total + 1).is_none());
        }

        #[test]
        fn prop_store_matches_slices(count in 1usize..30, page_size in 1u32..8) {
            let values = letters(count);
            let backend = InMemoryBackend::new();
            let store = PageStore::new(&backend);

            tokio_test::block_on(async {
                let pages = store.save(KEY, &values, page_size, None).await.unwrap();
                for p in 1..=pages {
                    let stored: Page<String> = store.get_page(KEY, page_size, p).await.unwrap().unwrap();
                    assert_eq!(Some(stored), slice_page(&values, page_size, p));
                }
                let beyond: Option<Page<String>> =
                    store.get_page(KEY, page_size, pages + 1).await.unwrap();
                assert!(beyond.is_none());
            });
        }
    }
}
