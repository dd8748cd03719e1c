//! Store record service.
//!
//! Creation, listing, lookup and owner-gated editing of stores. Slugs are
//! assigned here, right before a store is persisted.

use thiserror::Error;

use storefinder_core::{Slug, StoreId, UserId};

use crate::db::{RepositoryError, StoreRepository};
use crate::models::{Store, StoreDetail, StoreSubmission, ValidationError};

/// The acting user is not the store's author.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("You must own a store to edit it!")]
pub struct OwnershipError;

/// Check that `actor` is the recorded author of `store`.
///
/// Stores whose author is gone cannot be edited by anyone.
///
/// # Errors
///
/// Returns `OwnershipError` when the author differs from `actor`.
pub fn confirm_owner(store: &Store, actor: UserId) -> Result<(), OwnershipError> {
    if store.author == Some(actor) {
        Ok(())
    } else {
        Err(OwnershipError)
    }
}

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Submitted fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No store with the given ID or slug.
    #[error("store not found")]
    NotFound,

    /// The actor is not the author.
    #[error(transparent)]
    NotOwner(#[from] OwnershipError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Store record service.
pub struct StoreService<'a, R> {
    stores: &'a R,
}

impl<'a, R: StoreRepository> StoreService<'a, R> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(stores: &'a R) -> Self {
        Self { stores }
    }

    /// Validate a submission and save it as a new store authored by `author`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the submission is invalid.
    pub async fn create(
        &self,
        author: UserId,
        submission: StoreSubmission,
    ) -> Result<Store, StoreError> {
        let input = submission.validate()?;
        let slug = self.assign_slug(&input.name, None).await?;
        let store = self.stores.create(author, &slug, &input).await?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// All stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Store>, StoreError> {
        Ok(self.stores.list().await?)
    }

    /// A store and its author's name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has the slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<StoreDetail, StoreError> {
        self.stores
            .get_by_slug(slug)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Load a store for editing by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    /// Returns `StoreError::NotOwner` if `actor` is not the author.
    pub async fn edit(&self, actor: UserId, id: StoreId) -> Result<Store, StoreError> {
        let store = self
            .stores
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)?;
        confirm_owner(&store, actor)?;
        Ok(store)
    }

    /// Apply a submission to an existing store owned by `actor`.
    ///
    /// Only the submitted fields change; the photo is kept unless a new one
    /// was uploaded. Returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    /// Returns `StoreError::NotOwner` if `actor` is not the author.
    /// Returns `StoreError::Validation` if the submission is invalid.
    pub async fn update(
        &self,
        actor: UserId,
        id: StoreId,
        submission: StoreSubmission,
    ) -> Result<Store, StoreError> {
        let current = self.edit(actor, id).await?;
        let input = submission.validate()?;

        let slug = if input.name == current.name {
            current.slug
        } else {
            self.assign_slug(&input.name, Some(id)).await?
        };

        let store = self.stores.update(id, &slug, &input).await.map_err(|e| match e {
            RepositoryError::NotFound => StoreError::NotFound,
            other => StoreError::Repository(other),
        })?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "Store updated");
        Ok(store)
    }

    /// Derive the slug for `name`, numbering it past existing stores with the
    /// same base. `exclude` is the store being renamed, if any.
    async fn assign_slug(&self, name: &str, exclude: Option<StoreId>) -> Result<Slug, StoreError> {
        let base = Slug::from_name(name);
        let matches = self
            .stores
            .count_slug_collisions(&base.collision_pattern(), exclude)
            .await?;
        Ok(base.disambiguate(matches))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStoreRepository;

    const OWNER: UserId = UserId::new(1);
    const STRANGER: UserId = UserId::new(2);

    fn submission(name: &str) -> StoreSubmission {
        StoreSubmission {
            name: name.to_owned(),
            description: "Coffee".to_owned(),
            tags: vec!["Wifi".to_owned()],
            address: "1 Main St".to_owned(),
            longitude: "-79.38".to_owned(),
            latitude: "43.65".to_owned(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_same_name_gets_numbered_slugs() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);

        let first = service.create(OWNER, submission("Cafe One")).await.unwrap();
        let second = service.create(OWNER, submission("Cafe One")).await.unwrap();
        let third = service.create(OWNER, submission("cafe one")).await.unwrap();

        assert_eq!(first.slug.as_str(), "cafe-one");
        assert_eq!(second.slug.as_str(), "cafe-one-2");
        assert_eq!(third.slug.as_str(), "cafe-one-3");
    }

    #[tokio::test]
    async fn test_create_sets_author_and_validates() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);

        let store = service.create(OWNER, submission("Cafe One")).await.unwrap();
        assert_eq!(store.author, Some(OWNER));

        let err = service.create(OWNER, submission("  ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);
        service.create(OWNER, submission("Old")).await.unwrap();
        service.create(OWNER, submission("New")).await.unwrap();

        let names: Vec<_> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["New", "Old"]);
    }

    #[tokio::test]
    async fn test_get_by_slug_populates_author() {
        let repo = MemoryStoreRepository::default();
        repo.add_author(OWNER, "Wes");
        let service = StoreService::new(&repo);
        service.create(OWNER, submission("Cafe One")).await.unwrap();

        let detail = service.get_by_slug("cafe-one").await.unwrap();
        assert_eq!(detail.author_name.as_deref(), Some("Wes"));
        assert!(matches!(
            service.get_by_slug("nope").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_edit_or_update() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);
        let store = service.create(OWNER, submission("Cafe One")).await.unwrap();

        assert!(matches!(
            service.edit(STRANGER, store.id).await,
            Err(StoreError::NotOwner(OwnershipError))
        ));
        assert!(matches!(
            service
                .update(STRANGER, store.id, submission("Hijacked"))
                .await,
            Err(StoreError::NotOwner(OwnershipError))
        ));
        assert_eq!(service.edit(OWNER, store.id).await.unwrap().name, "Cafe One");
    }

    #[tokio::test]
    async fn test_update_keeps_slug_unless_renamed() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);
        let store = service.create(OWNER, submission("Cafe One")).await.unwrap();

        let mut same_name = submission("Cafe One");
        same_name.description = "Better coffee".to_owned();
        let updated = service.update(OWNER, store.id, same_name).await.unwrap();
        assert_eq!(updated.slug.as_str(), "cafe-one");
        assert_eq!(updated.description.as_deref(), Some("Better coffee"));

        let renamed = service
            .update(OWNER, store.id, submission("Cafe Two"))
            .await
            .unwrap();
        assert_eq!(renamed.slug.as_str(), "cafe-two");
    }

    #[tokio::test]
    async fn test_rename_excludes_self_from_collisions() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);
        let store = service.create(OWNER, submission("Cafe One")).await.unwrap();

        let renamed = service
            .update(OWNER, store.id, submission("Cafe-One"))
            .await
            .unwrap();
        assert_eq!(renamed.slug.as_str(), "cafe-one");
    }

    #[tokio::test]
    async fn test_update_keeps_photo_without_new_upload() {
        let repo = MemoryStoreRepository::default();
        let service = StoreService::new(&repo);
        let mut with_photo = submission("Cafe One");
        with_photo.photo = Some("abc.jpeg".to_owned());
        let store = service.create(OWNER, with_photo).await.unwrap();

        let updated = service
            .update(OWNER, store.id, submission("Cafe One"))
            .await
            .unwrap();
        assert_eq!(updated.photo.as_deref(), Some("abc.jpeg"));
    }

    #[test]
    fn test_confirm_owner() {
        let store = Store {
            id: StoreId::new(1),
            name: "Cafe".to_owned(),
            slug: Slug::from_name("Cafe"),
            description: None,
            tags: Vec::new(),
            created_at: chrono::Utc::now(),
            location: crate::models::Location {
                kind: crate::models::store::POINT.to_owned(),
                coordinates: [0.0, 0.0],
                address: "Nowhere".to_owned(),
            },
            photo: None,
            author: None,
        };
        assert_eq!(confirm_owner(&store, OWNER), Err(OwnershipError));

        let owned = Store {
            author: Some(OWNER),
            ..store
        };
        assert!(confirm_owner(&owned, OWNER).is_ok());
        assert_eq!(confirm_owner(&owned, STRANGER), Err(OwnershipError));
    }
}
