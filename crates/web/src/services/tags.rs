//! Tag aggregation across stores.

use crate::db::{RepositoryError, StoreRepository};
use crate::models::{Store, TagCount};

/// Everything the tags page shows.
#[derive(Debug)]
pub struct TagPage {
    /// Every tag in use, most common first.
    pub tags: Vec<TagCount>,
    /// Stores carrying the selected tag (all stores when none is selected).
    pub stores: Vec<Store>,
}

/// Read-only tag queries, recomputed on every call.
pub struct TagService<'a, R> {
    stores: &'a R,
}

impl<'a, R: StoreRepository> TagService<'a, R> {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(stores: &'a R) -> Self {
        Self { stores }
    }

    /// Per-tag store counts, by descending count then tag name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let mut counts = self.stores.tag_counts().await?;
        sort_counts(&mut counts);
        Ok(counts)
    }

    /// Stores carrying `tag`, or every store when `tag` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn stores_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        self.stores.list_by_tag(tag).await
    }

    /// Tag counts and matching stores, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either query fails.
    pub async fn page(&self, tag: Option<&str>) -> Result<TagPage, RepositoryError> {
        let (tags, stores) = tokio::try_join!(self.tag_counts(), self.stores_by_tag(tag))?;
        Ok(TagPage { tags, stores })
    }
}

fn sort_counts(counts: &mut [TagCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStoreRepository;
    use crate::models::StoreSubmission;
    use crate::services::stores::StoreService;
    use storefinder_core::UserId;

    async fn seed(repo: &MemoryStoreRepository, name: &str, tags: &[&str]) {
        let submission = StoreSubmission {
            name: name.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            address: "1 Main St".to_owned(),
            longitude: "0".to_owned(),
            latitude: "0".to_owned(),
            ..StoreSubmission::default()
        };
        StoreService::new(repo)
            .create(UserId::new(1), submission)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_counts_sorted_by_frequency() {
        let repo = MemoryStoreRepository::default();
        seed(&repo, "A", &["Wifi", "Licensed"]).await;
        seed(&repo, "B", &["Wifi", "Open Late"]).await;
        seed(&repo, "C", &["Wifi", "Open Late", "Wifi"]).await;

        let counts = TagService::new(&repo).tag_counts().await.unwrap();
        let pairs: Vec<_> = counts.iter().map(|c| (c.tag.as_str(), c.count)).collect();
        assert_eq!(pairs, [("Wifi", 3), ("Open Late", 2), ("Licensed", 1)]);
    }

    #[tokio::test]
    async fn test_ties_break_alphabetically() {
        let repo = MemoryStoreRepository::default();
        seed(&repo, "A", &["Vegetarian", "Licensed"]).await;

        let counts = TagService::new(&repo).tag_counts().await.unwrap();
        let tags: Vec<_> = counts.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, ["Licensed", "Vegetarian"]);
    }

    #[tokio::test]
    async fn test_page_filters_by_tag() {
        let repo = MemoryStoreRepository::default();
        seed(&repo, "A", &["Wifi"]).await;
        seed(&repo, "B", &[]).await;

        let service = TagService::new(&repo);
        let page = service.page(Some("Wifi")).await.unwrap();
        assert_eq!(page.stores.len(), 1);
        assert_eq!(page.stores[0].name, "A");
        assert_eq!(page.tags.len(), 1);

        let all = service.page(None).await.unwrap();
        assert_eq!(all.stores.len(), 2);

        let none = service.page(Some("Licensed")).await.unwrap();
        assert!(none.stores.is_empty());
    }
}
