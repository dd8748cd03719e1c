//! In-memory repositories for service tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use storefinder_core::{Email, Slug, SlugPattern, StoreId, UserId};

use super::{RepositoryError, StoreRepository, UserRepository};
use crate::models::{PasswordReset, ResetToken, Store, StoreDetail, StoreInput, TagCount, User};

#[derive(Default)]
pub struct MemoryStoreRepository {
    stores: Mutex<Vec<Store>>,
    /// Author names used to populate `StoreDetail`.
    authors: Mutex<Vec<(UserId, String)>>,
}

impl MemoryStoreRepository {
    pub fn add_author(&self, id: UserId, name: &str) {
        self.authors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((id, name.to_owned()));
    }

    fn stores(&self) -> std::sync::MutexGuard<'_, Vec<Store>> {
        self.stores
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StoreRepository for MemoryStoreRepository {
    async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        let mut stores = self.stores().clone();
        stores.reverse();
        Ok(stores)
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let mut stores: Vec<Store> = self
            .stores()
            .iter()
            .filter(|s| tag.is_none_or(|t| s.tags.iter().any(|x| x == t)))
            .cloned()
            .collect();
        stores.reverse();
        Ok(stores)
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.stores().iter().find(|s| s.id == id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<StoreDetail>, RepositoryError> {
        let store = self.stores().iter().find(|s| s.slug.as_str() == slug).cloned();
        let authors = self
            .authors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(store.map(|store| {
            let author_name = store.author.and_then(|a| {
                authors
                    .iter()
                    .find(|(id, _)| *id == a)
                    .map(|(_, name)| name.clone())
            });
            StoreDetail { store, author_name }
        }))
    }

    async fn count_slug_collisions(
        &self,
        pattern: &SlugPattern,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError> {
        let stores = self.stores();
        pattern
            .count_matches(
                stores
                    .iter()
                    .filter(|s| Some(s.id) != exclude)
                    .map(|s| s.slug.as_str()),
            )
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    async fn create(
        &self,
        author: UserId,
        slug: &Slug,
        input: &StoreInput,
    ) -> Result<Store, RepositoryError> {
        let mut stores = self.stores();
        let id = StoreId::new(i32::try_from(stores.len()).unwrap_or(i32::MAX) + 1);
        let store = Store {
            id,
            name: input.name.clone(),
            slug: slug.clone(),
            description: input.description.clone(),
            tags: input.tags.clone(),
            created_at: Utc::now(),
            location: input.location.clone(),
            photo: input.photo.clone(),
            author: Some(author),
        };
        stores.push(store.clone());
        Ok(store)
    }

    async fn update(
        &self,
        id: StoreId,
        slug: &Slug,
        input: &StoreInput,
    ) -> Result<Store, RepositoryError> {
        let mut stores = self.stores();
        let store = stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        store.name.clone_from(&input.name);
        store.slug = slug.clone();
        store.description.clone_from(&input.description);
        store.tags.clone_from(&input.tags);
        store.location = input.location.clone();
        if input.photo.is_some() {
            store.photo.clone_from(&input.photo);
        }
        Ok(store.clone())
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let mut counts: Vec<TagCount> = Vec::new();
        for store in self.stores().iter() {
            for tag in &store.tags {
                match counts.iter_mut().find(|c| &c.tag == tag) {
                    Some(c) => c.count += 1,
                    None => counts.push(TagCount {
                        tag: tag.clone(),
                        count: 1,
                    }),
                }
            }
        }
        Ok(counts)
    }
}

struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserRepository {
    fn users(&self) -> std::sync::MutexGuard<'_, Vec<UserRecord>> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current password hash for `id`.
    pub fn password_hash(&self, id: UserId) -> Option<String> {
        self.users()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.password_hash.clone())
    }

    /// Overwrite the expiry of a pending reset.
    pub fn expire_reset(&self, id: UserId, expires_at: DateTime<Utc>) {
        if let Some(reset) = self
            .users()
            .iter_mut()
            .find(|r| r.user.id == id)
            .and_then(|r| r.user.password_reset.as_mut())
        {
            reset.expires_at = expires_at;
        }
    }
}

impl UserRepository for MemoryUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users()
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .users()
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users();
        if users.iter().any(|r| &r.user.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(i32::try_from(users.len()).unwrap_or(i32::MAX) + 1),
            email: email.clone(),
            name: name.to_owned(),
            password_reset: None,
            created_at: now,
            updated_at: now,
        };
        users.push(UserRecord {
            user: user.clone(),
            password_hash: password_hash.to_owned(),
        });
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        email: &Email,
        name: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users();
        if users
            .iter()
            .any(|r| &r.user.email == email && r.user.id != id)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let record = users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.user.email = email.clone();
        name.clone_into(&mut record.user.name);
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }

    async fn set_password_reset(
        &self,
        id: UserId,
        reset: &PasswordReset,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users();
        let record = users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.user.password_reset = Some(reset.clone());
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token: &ResetToken,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users()
            .iter()
            .find(|r| {
                r.user
                    .password_reset
                    .as_ref()
                    .is_some_and(|p| &p.token == token && p.is_valid_at(now))
            })
            .map(|r| r.user.clone()))
    }

    async fn complete_password_reset(
        &self,
        token: &ResetToken,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users();
        let Some(record) = users.iter_mut().find(|r| {
            r.user
                .password_reset
                .as_ref()
                .is_some_and(|p| &p.token == token && p.is_valid_at(now))
        }) else {
            return Ok(None);
        };
        record.user.password_reset = None;
        password_hash.clone_into(&mut record.password_hash);
        record.user.updated_at = now;
        Ok(Some(record.user.clone()))
    }
}
