//! Store route handlers.
//!
//! Listing, detail, and the add/edit form. Form posts are multipart because
//! they may carry a photo; the photo is processed before the rest of the
//! form is validated.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use storefinder_core::{STORE_TAG_CHOICES, StoreId, UserId};

use crate::error::{AppError, Result, recover};
use crate::filters;
use crate::middleware::{
    FlashKind, FlashLink, Page, RequireAuth, push_flash, push_flash_with_link,
};
use crate::models::{Store, StoreDetail, StoreSubmission};
use crate::routes::tags::tag_href;
use crate::services::images::{PHOTO_FIELD, PhotoSlot, Upload};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Store summary for listing pages.
#[derive(Debug, Clone)]
pub struct StoreCard {
    pub id: StoreId,
    pub name: String,
    /// Link to the detail page.
    pub href: String,
    pub description: String,
    pub photo_url: Option<String>,
    /// Whether the viewer may edit this store.
    pub editable: bool,
}

impl StoreCard {
    /// Build cards for `stores` as seen by `viewer`.
    #[must_use]
    pub fn list(stores: Vec<Store>, viewer: Option<UserId>) -> Vec<Self> {
        stores
            .into_iter()
            .map(|store| Self {
                id: store.id,
                editable: viewer.is_some() && store.author == viewer,
                photo_url: store.photo.as_deref().map(upload_url),
                href: store_href(store.slug.as_str()),
                name: store.name,
                description: store.description.unwrap_or_default(),
            })
            .collect()
    }
}

/// Full store for the detail page.
#[derive(Debug, Clone)]
pub struct StoreView {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
    /// `(tag, link)` pairs.
    pub tags: Vec<(String, String)>,
    pub photo_url: Option<String>,
    pub author_name: Option<String>,
    pub created: String,
}

impl From<StoreDetail> for StoreView {
    fn from(detail: StoreDetail) -> Self {
        let store = detail.store;
        Self {
            longitude: store.location.longitude(),
            latitude: store.location.latitude(),
            address: store.location.address,
            photo_url: store.photo.as_deref().map(upload_url),
            created: store.created_at.format("%B %-d, %Y").to_string(),
            name: store.name,
            description: store.description,
            tags: store
                .tags
                .into_iter()
                .map(|tag| {
                    let href = tag_href(&tag);
                    (tag, href)
                })
                .collect(),
            author_name: detail.author_name,
        }
    }
}

/// Current values of the add/edit form.
#[derive(Debug, Clone, Default)]
pub struct StoreFormView {
    pub name: String,
    pub description: String,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
    pub photo_url: Option<String>,
    /// Detail page link, once the store exists.
    pub href: Option<String>,
}

impl From<&Store> for StoreFormView {
    fn from(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone().unwrap_or_default(),
            address: store.location.address.clone(),
            longitude: store.location.longitude().to_string(),
            latitude: store.location.latitude().to_string(),
            photo_url: store.photo.as_deref().map(upload_url),
            href: Some(store_href(store.slug.as_str())),
        }
    }
}

/// Path of a store's detail page.
///
/// Slugs keep any non-ASCII letters from the name, so they are
/// percent-encoded before going into a link or `Location` header.
#[must_use]
pub fn store_href(slug: &str) -> String {
    format!("/store/{}", urlencoding::encode(slug))
}

/// A tag checkbox on the store form.
#[derive(Debug, Clone)]
pub struct TagChoice {
    pub name: &'static str,
    pub checked: bool,
}

fn tag_choices(selected: &[String]) -> Vec<TagChoice> {
    STORE_TAG_CHOICES
        .iter()
        .map(|&name| TagChoice {
            name,
            checked: selected.iter().any(|t| t == name),
        })
        .collect()
}

/// Public URL of an uploaded photo.
#[must_use]
pub fn upload_url(filename: &str) -> String {
    format!("/uploads/{filename}")
}

// =============================================================================
// Templates
// =============================================================================

/// Store listing template.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub title: String,
    pub page: Page,
    pub stores: Vec<StoreCard>,
}

/// Store detail template.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub title: String,
    pub page: Page,
    pub store: StoreView,
}

/// Add/edit store form template.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct EditStoreTemplate {
    pub title: String,
    pub page: Page,
    pub action: String,
    pub form: StoreFormView,
    pub tags: Vec<TagChoice>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List every store, newest first.
pub async fn list(State(state): State<AppState>, page: Page) -> Result<impl IntoResponse> {
    let stores = state.store_service().list().await?;
    let viewer = page.user.as_ref().map(|u| u.id);

    Ok(StoresTemplate {
        title: "Stores".to_string(),
        stores: StoreCard::list(stores, viewer),
        page,
    })
}

/// Show one store with its author.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = state.store_service().get_by_slug(&slug).await?;

    Ok(StoreTemplate {
        title: detail.store.name.clone(),
        store: detail.into(),
        page: Page::for_session(&session).await,
    })
}

/// Empty form for a new store.
pub async fn add_form(RequireAuth(_user): RequireAuth, page: Page) -> impl IntoResponse {
    EditStoreTemplate {
        title: "Add Store".to_string(),
        page,
        action: "/add".to_string(),
        form: StoreFormView::default(),
        tags: tag_choices(&[]),
    }
}

/// Create a store from the submitted form.
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let back = "/add";

    let submission = match read_submission(&state, multipart).await {
        Ok(submission) => submission,
        Err(e) => return recover(&session, e, back).await,
    };

    let store = match state.store_service().create(user.id, submission).await {
        Ok(store) => store,
        Err(e) => return recover(&session, e, back).await,
    };

    push_flash(
        &session,
        FlashKind::Success,
        format!(
            "Successfully created {}. Care to leave a review?",
            store.name
        ),
    )
    .await?;
    Ok(Redirect::to(&store_href(store.slug.as_str())).into_response())
}

/// Form for editing a store the user owns.
pub async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Response> {
    let store = match state.store_service().edit(user.id, id).await {
        Ok(store) => store,
        Err(e) => return recover(&session, e, "/stores").await,
    };

    Ok(EditStoreTemplate {
        title: format!("Edit {}", store.name),
        page: Page::for_session(&session).await,
        action: format!("/add/{id}"),
        form: StoreFormView::from(&store),
        tags: tag_choices(&store.tags),
    }
    .into_response())
}

/// Apply the submitted form to a store the user owns.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let back = format!("/stores/{id}/edit");

    // Refuse non-owners before any upload touches the disk.
    if let Err(e) = state.store_service().edit(user.id, id).await {
        return recover(&session, e, "/stores").await;
    }

    let submission = match read_submission(&state, multipart).await {
        Ok(submission) => submission,
        Err(e) => return recover(&session, e, &back).await,
    };

    let store = match state.store_service().update(user.id, id, submission).await {
        Ok(store) => store,
        Err(e) => return recover(&session, e, &back).await,
    };

    push_flash_with_link(
        &session,
        FlashKind::Success,
        format!("Successfully updated {}.", store.name),
        FlashLink {
            href: store_href(store.slug.as_str()),
            label: "View Store →".to_string(),
        },
    )
    .await?;
    Ok(Redirect::to(&back).into_response())
}

// =============================================================================
// Form Parsing
// =============================================================================

/// Read the store form and run the photo, if any, through image intake.
async fn read_submission(state: &AppState, multipart: Multipart) -> Result<StoreSubmission> {
    let (mut submission, upload) = parse_store_form(multipart).await?;
    submission.photo = state.images().intake(upload).await?;
    Ok(submission)
}

/// Split a multipart store form into text fields and the photo part.
///
/// Field names follow the HTML form: `location[address]`,
/// `location[coordinates][0]` (longitude) and `location[coordinates][1]`
/// (latitude); `tags` may repeat.
async fn parse_store_form(mut multipart: Multipart) -> Result<(StoreSubmission, Option<Upload>)> {
    let mut submission = StoreSubmission::default();
    let mut photo = PhotoSlot::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == PHOTO_FIELD {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(bad_form)?.to_vec();
            photo.accept(Upload {
                content_type,
                bytes,
            })?;
            continue;
        }

        let value = field.text().await.map_err(bad_form)?;
        match name.as_str() {
            "name" => submission.name = value,
            "description" => submission.description = value,
            "tags" => submission.tags.push(value),
            "location[address]" => submission.address = value,
            "location[coordinates][0]" => submission.longitude = value,
            "location[coordinates][1]" => submission.latitude = value,
            _ => {}
        }
    }

    Ok((submission, photo.into_upload()))
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Could not read the form: {}", e.body_text()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use storefinder_core::Slug;

    use super::*;
    use crate::models::Location;

    fn store(author: Option<UserId>) -> Store {
        Store {
            id: StoreId::new(7),
            name: "Cafe One".to_string(),
            slug: Slug::from_name("Cafe One"),
            description: Some("Coffee".to_string()),
            tags: vec!["Wifi".to_string()],
            created_at: Utc::now(),
            location: Location {
                kind: crate::models::store::POINT.to_string(),
                coordinates: [-79.38, 43.65],
                address: "1 Main St".to_string(),
            },
            photo: Some("abc.jpeg".to_string()),
            author,
        }
    }

    #[test]
    fn test_cards_editable_only_for_author() {
        let owner = UserId::new(1);
        let cards = StoreCard::list(vec![store(Some(owner))], Some(owner));
        assert!(cards[0].editable);
        assert_eq!(cards[0].photo_url.as_deref(), Some("/uploads/abc.jpeg"));

        let cards = StoreCard::list(vec![store(Some(owner))], Some(UserId::new(2)));
        assert!(!cards[0].editable);

        let cards = StoreCard::list(vec![store(None)], None);
        assert!(!cards[0].editable);
    }

    #[test]
    fn test_tag_choices_mark_selected() {
        let choices = tag_choices(&["Wifi".to_string(), "Licensed".to_string()]);
        let checked: Vec<_> = choices
            .iter()
            .filter(|c| c.checked)
            .map(|c| c.name)
            .collect();
        assert_eq!(checked, ["Wifi", "Licensed"]);
        assert_eq!(choices.len(), STORE_TAG_CHOICES.len());
    }

    #[test]
    fn test_form_view_from_store() {
        let form = StoreFormView::from(&store(None));
        assert_eq!(form.longitude, "-79.38");
        assert_eq!(form.latitude, "43.65");
        assert_eq!(form.href.as_deref(), Some("/store/cafe-one"));
    }

    #[test]
    fn test_store_href_encodes_non_ascii_slugs() {
        assert_eq!(store_href("cafe-one"), "/store/cafe-one");
        assert_eq!(store_href("café-one"), "/store/caf%C3%A9-one");

        let mut unicode = store(None);
        unicode.slug = Slug::from_name("Café Ñandú");
        let cards = StoreCard::list(vec![unicode], None);
        assert!(cards[0].href.is_ascii());
        assert!(axum::http::HeaderValue::from_str(&cards[0].href).is_ok());
    }
}
