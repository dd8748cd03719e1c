//! Store repository backed by `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storefinder_core::{Slug, SlugPattern, StoreId, UserId};

use super::{RepositoryError, StoreRepository};
use crate::models::{Location, Store, StoreDetail, StoreInput, TagCount};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    location_type: String,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
    author_id: Option<i32>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::new(row.id),
            name: row.name,
            slug: Slug::from_stored(row.slug),
            description: row.description,
            tags: row.tags,
            created_at: row.created_at,
            location: Location {
                kind: row.location_type,
                coordinates: [row.longitude, row.latitude],
                address: row.address,
            },
            photo: row.photo,
            author: row.author_id.map(UserId::new),
        }
    }
}

/// Store row joined with its author.
#[derive(Debug, sqlx::FromRow)]
struct StoreDetailRow {
    #[sqlx(flatten)]
    store: StoreRow,
    author_name: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for store database operations.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StoreRepository for PgStoreRepository {
    async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, created_at,
                   location_type, longitude, latitude, address, photo, author_id
            FROM stores
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, created_at,
                   location_type, longitude, latitude, address, photo, author_id
            FROM stores
            WHERE $1::TEXT IS NULL OR $1 = ANY(tags)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, slug, description, tags, created_at,
                   location_type, longitude, latitude, address, photo, author_id
            FROM stores
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<StoreDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreDetailRow>(
            r"
            SELECT s.id, s.name, s.slug, s.description, s.tags, s.created_at,
                   s.location_type, s.longitude, s.latitude, s.address, s.photo,
                   s.author_id, u.name AS author_name
            FROM stores s
            LEFT JOIN users u ON u.id = s.author_id
            WHERE s.slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoreDetail {
            store: r.store.into(),
            author_name: r.author_name,
        }))
    }

    async fn count_slug_collisions(
        &self,
        pattern: &SlugPattern,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM stores
            WHERE slug ~* $1
              AND ($2::INTEGER IS NULL OR id <> $2)
            ",
        )
        .bind(pattern.as_str())
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        usize::try_from(count)
            .map_err(|e| RepositoryError::DataCorruption(format!("negative count: {e}")))
    }

    async fn create(
        &self,
        author: UserId,
        slug: &Slug,
        input: &StoreInput,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            INSERT INTO stores
                (name, slug, description, tags, location_type, longitude, latitude,
                 address, photo, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, slug, description, tags, created_at,
                      location_type, longitude, latitude, address, photo, author_id
            ",
        )
        .bind(&input.name)
        .bind(slug.as_str())
        .bind(input.description.as_deref())
        .bind(input.tags.as_slice())
        .bind(&input.location.kind)
        .bind(input.location.longitude())
        .bind(input.location.latitude())
        .bind(&input.location.address)
        .bind(input.photo.as_deref())
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(
        &self,
        id: StoreId,
        slug: &Slug,
        input: &StoreInput,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            UPDATE stores
            SET name = $2,
                slug = $3,
                description = $4,
                tags = $5,
                location_type = $6,
                longitude = $7,
                latitude = $8,
                address = $9,
                photo = COALESCE($10, photo)
            WHERE id = $1
            RETURNING id, name, slug, description, tags, created_at,
                      location_type, longitude, latitude, address, photo, author_id
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(slug.as_str())
        .bind(input.description.as_deref())
        .bind(input.tags.as_slice())
        .bind(&input.location.kind)
        .bind(input.location.longitude())
        .bind(input.location.latitude())
        .bind(&input.location.address)
        .bind(input.photo.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::from).ok_or(RepositoryError::NotFound)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, TagCount>(
            r"
            SELECT tag, COUNT(DISTINCT s.id) AS count
            FROM stores s, UNNEST(s.tags) AS tag
            GROUP BY tag
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
