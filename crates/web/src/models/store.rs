//! Store domain types and submission validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use storefinder_core::{Slug, StoreId, UserId, normalize_tags};

/// GeoJSON type tag for store locations.
pub const POINT: &str = "Point";

/// A store listed in the directory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Display name (trimmed, non-empty).
    pub name: String,
    /// URL slug derived from the name.
    pub slug: Slug,
    /// Free-form description.
    pub description: Option<String>,
    /// Tags, without duplicates.
    pub tags: Vec<String>,
    /// When the store was added.
    pub created_at: DateTime<Utc>,
    /// Where the store is.
    pub location: Location,
    /// Generated filename of the uploaded photo.
    pub photo: Option<String>,
    /// User who added the store.
    pub author: Option<UserId>,
}

/// A store location as a GeoJSON-style point plus a street address.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Geometry type, always [`POINT`].
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
    /// Street address.
    pub address: String,
}

impl Location {
    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A store with its author populated.
#[derive(Debug, Clone)]
pub struct StoreDetail {
    /// The store itself.
    pub store: Store,
    /// Author's display name, if the author still exists.
    pub author_name: Option<String>,
}

/// Tag occurrence count across all stores.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TagCount {
    /// The tag.
    pub tag: String,
    /// Number of stores carrying the tag.
    pub count: i64,
}

/// Raw store fields as submitted by the add/edit form.
///
/// Only these fields are accepted from the client; the author, slug and
/// creation time are never taken from a submission.
#[derive(Debug, Clone, Default)]
pub struct StoreSubmission {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
    /// Filename produced by image intake, when a new photo was uploaded.
    pub photo: Option<String>,
}

/// A validated store submission ready to persist.
#[derive(Debug, Clone)]
pub struct StoreInput {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
}

/// One or more store fields failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed: {}", .messages.join("; "))]
pub struct ValidationError {
    /// Human-readable messages, one per failed constraint.
    pub messages: Vec<String>,
}

impl StoreSubmission {
    /// Validate and normalize the submission.
    ///
    /// All failed constraints are reported together.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the name or address is blank or the
    /// coordinates are missing or not numbers.
    pub fn validate(self) -> Result<StoreInput, ValidationError> {
        let mut messages = Vec::new();

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            messages.push("Please enter a store name".to_owned());
        }

        let address = self.address.trim().to_owned();
        if address.is_empty() {
            messages.push("You must supply an address".to_owned());
        }

        let coordinates = match (
            parse_coordinate(&self.longitude),
            parse_coordinate(&self.latitude),
        ) {
            (Some(Ok(lng)), Some(Ok(lat))) => Some([lng, lat]),
            (None, _) | (_, None) => {
                messages.push("Coordinates must be supplied".to_owned());
                None
            }
            _ => {
                messages.push("Coordinates must be numbers".to_owned());
                None
            }
        };

        let Some(coordinates) = coordinates.filter(|_| messages.is_empty()) else {
            return Err(ValidationError { messages });
        };

        let description = Some(self.description.trim().to_owned()).filter(|d| !d.is_empty());

        Ok(StoreInput {
            name,
            description,
            tags: normalize_tags(&self.tags),
            location: Location {
                kind: POINT.to_owned(),
                coordinates,
                address,
            },
            photo: self.photo,
        })
    }
}

/// `None` when blank, `Some(Err)` when present but not a finite number.
fn parse_coordinate(raw: &str) -> Option<Result<f64, ()>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or(()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn submission() -> StoreSubmission {
        StoreSubmission {
            name: "  Cafe One ".to_owned(),
            description: "Great coffee".to_owned(),
            tags: vec!["Wifi".to_owned(), "Wifi".to_owned(), "Open Late".to_owned()],
            address: "1 Main St".to_owned(),
            longitude: "-79.38".to_owned(),
            latitude: "43.65".to_owned(),
            photo: None,
        }
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let input = submission().validate().unwrap();
        assert_eq!(input.name, "Cafe One");
        assert_eq!(input.description.as_deref(), Some("Great coffee"));
        assert_eq!(input.tags, ["Wifi", "Open Late"]);
        assert_eq!(input.location.kind, POINT);
        assert!((input.location.longitude() - -79.38).abs() < f64::EPSILON);
        assert!((input.location.latitude() - 43.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_description_becomes_none() {
        let input = StoreSubmission {
            description: "   ".to_owned(),
            ..submission()
        }
        .validate()
        .unwrap();
        assert!(input.description.is_none());
    }

    #[test]
    fn test_validate_reports_all_failures() {
        let err = StoreSubmission {
            name: "   ".to_owned(),
            address: String::new(),
            longitude: String::new(),
            ..submission()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err.messages,
            [
                "Please enter a store name",
                "You must supply an address",
                "Coordinates must be supplied"
            ]
        );
    }

    #[test]
    fn test_non_numeric_coordinates_rejected() {
        let err = StoreSubmission {
            latitude: "north".to_owned(),
            ..submission()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.messages, ["Coordinates must be numbers"]);
    }
}
