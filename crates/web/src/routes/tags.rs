//! Tag page handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use crate::error::Result;
use crate::filters;
use crate::middleware::Page;
use crate::models::TagCount;
use crate::routes::stores::StoreCard;
use crate::state::AppState;

/// A tag link with its store count.
#[derive(Debug, Clone)]
pub struct TagLink {
    pub tag: String,
    pub href: String,
    pub count: i64,
    pub active: bool,
}

fn tag_links(counts: Vec<TagCount>, selected: Option<&str>) -> Vec<TagLink> {
    counts
        .into_iter()
        .map(|c| TagLink {
            active: selected == Some(c.tag.as_str()),
            href: tag_href(&c.tag),
            tag: c.tag,
            count: c.count,
        })
        .collect()
}

/// Link to the page for `tag`.
#[must_use]
pub fn tag_href(tag: &str) -> String {
    format!("/tags/{}", urlencoding::encode(tag))
}

/// Tags page template.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub title: String,
    pub page: Page,
    pub tag: Option<String>,
    pub tags: Vec<TagLink>,
    pub stores: Vec<StoreCard>,
}

/// Every tag, and every store.
pub async fn all(State(state): State<AppState>, page: Page) -> Result<impl IntoResponse> {
    render(&state, page, None).await
}

/// Every tag, and the stores carrying `tag`.
pub async fn by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    page: Page,
) -> Result<impl IntoResponse> {
    render(&state, page, Some(tag)).await
}

async fn render(state: &AppState, page: Page, tag: Option<String>) -> Result<TagsTemplate> {
    let tag_page = state.tag_service().page(tag.as_deref()).await?;
    let viewer = page.user.as_ref().map(|u| u.id);

    Ok(TagsTemplate {
        title: tag.clone().unwrap_or_else(|| "Tags".to_string()),
        tags: tag_links(tag_page.tags, tag.as_deref()),
        stores: StoreCard::list(tag_page.stores, viewer),
        tag,
        page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_links_mark_active() {
        let counts = vec![
            TagCount {
                tag: "Wifi".to_string(),
                count: 3,
            },
            TagCount {
                tag: "Licensed".to_string(),
                count: 1,
            },
        ];
        let links = tag_links(counts, Some("Licensed"));
        assert!(!links[0].active);
        assert!(links[1].active);
        assert_eq!(links[0].count, 3);
    }

    #[test]
    fn test_tag_href_encodes_spaces() {
        assert_eq!(tag_href("Open Late"), "/tags/Open%20Late");
    }
}
