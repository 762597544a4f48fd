use serde::{Deserialize, Serialize};

use crate::error::{Field, ValidationError};
use crate::model::UserId;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous user";

/// A place as shown to the current viewer. Rebuilt from a [PlaceRecord] on every fetch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub rating: u8,
    pub description: String,
    pub image: String,
    pub author: String,
    pub likes: u32,
    pub comments: u32,
    pub tags: Vec<String>,
    pub is_liked: bool,
}

impl Place {
    pub fn project(record: PlaceRecord, viewer: Option<&UserId>) -> Place {
        let likes = record.place_likes.unwrap_or_default();
        let is_liked = match viewer {
            Some(viewer) => likes.iter().any(|like| &like.user_id == viewer),
            None => false,
        };

        let author = record
            .profiles
            .and_then(|profile| profile.display_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());

        let image = record
            .image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

        Place {
            id: record.id,
            name: record.name,
            kind: record.kind,
            location: record.location,
            rating: record.rating.clamp(1, 5) as u8,
            description: record.description,
            image,
            author,
            likes: likes.len() as u32,
            // no backing collection for comments yet
            comments: 0,
            tags: record.tags.unwrap_or_default(),
            is_liked,
        }
    }
}

/// Row of `places` joined with `profiles(display_name)` and `place_likes(user_id)`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub description: String,
    pub rating: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub user_id: UserId,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub profiles: Option<ProfileRef>,
    #[serde(default)]
    pub place_likes: Option<Vec<LikeRef>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileRef {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LikeRef {
    pub user_id: UserId,
}

/// Insert payload for the `places` collection.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NewPlace {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub description: String,
    pub rating: u8,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub user_id: UserId,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LikeKey {
    pub place_id: String,
    pub user_id: UserId,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NewReport {
    pub place_id: String,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Unvalidated form input for a new place.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PlaceCandidate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    pub description: String,
    pub rating: i64,
    /// Comma separated.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub image: String,
}

impl PlaceCandidate {
    pub fn validate(self, owner: &UserId) -> Result<NewPlace, ValidationError> {
        let name = required(&self.name, Field::Name)?;
        let kind = required(&self.kind, Field::Type)?;
        let location = required(&self.location, Field::Location)?;
        let description = required(&self.description, Field::Description)?;

        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::InvalidRating(self.rating));
        }

        let image = self.image.trim();

        Ok(NewPlace {
            name,
            kind,
            location,
            description,
            rating: self.rating as u8,
            tags: split_tags(&self.tags),
            image_url: (!image.is_empty()).then(|| image.to_string()),
            user_id: owner.clone(),
        })
    }
}

fn required(value: &str, field: Field) -> Result<String, ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }

    Ok(value.to_string())
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PlaceRecord {
        PlaceRecord {
            id: "p1".into(),
            name: "Le Central".into(),
            kind: "Café".into(),
            location: "Paris".into(),
            description: "Corner café".into(),
            rating: 4,
            image_url: None,
            tags: None,
            user_id: UserId::from("owner"),
            created_at: "2024-05-01T10:00:00Z".into(),
            updated_at: None,
            profiles: None,
            place_likes: Some(vec![
                LikeRef { user_id: UserId::from("alice") },
                LikeRef { user_id: UserId::from("bob") },
            ]),
        }
    }

    fn candidate() -> PlaceCandidate {
        PlaceCandidate {
            name: " Sky Bar ".into(),
            kind: "Bar".into(),
            location: "Lyon".into(),
            description: "Rooftop".into(),
            rating: 5,
            tags: "view, , cocktails ,".into(),
            image: "  ".into(),
        }
    }

    #[test]
    fn projection_fills_sentinels_and_counts_likes() {
        let place = Place::project(record(), None);

        assert_eq!(place.image, PLACEHOLDER_IMAGE);
        assert_eq!(place.author, ANONYMOUS_AUTHOR);
        assert_eq!(place.likes, 2);
        assert_eq!(place.comments, 0);
        assert!(place.tags.is_empty());
        assert!(!place.is_liked);
    }

    #[test]
    fn projection_resolves_liked_per_viewer() {
        let alice = UserId::from("alice");
        let carol = UserId::from("carol");

        assert!(Place::project(record(), Some(&alice)).is_liked);
        assert!(!Place::project(record(), Some(&carol)).is_liked);
    }

    #[test]
    fn projection_uses_profile_display_name() {
        let mut with_profile = record();
        with_profile.profiles = Some(ProfileRef {
            display_name: Some("Alice".into()),
        });
        assert_eq!(Place::project(with_profile, None).author, "Alice");

        let mut nameless = record();
        nameless.profiles = Some(ProfileRef { display_name: None });
        assert_eq!(Place::project(nameless, None).author, ANONYMOUS_AUTHOR);
    }

    #[test]
    fn record_deserializes_from_joined_row() {
        let row = r#"{
            "id": "p9", "name": "Parc", "type": "Parc", "location": "Nantes",
            "description": "Green", "rating": 3, "image_url": null,
            "tags": ["trees"], "user_id": "u1",
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z",
            "profiles": {"display_name": "Bob"}, "place_likes": [{"user_id": "u2"}]
        }"#;

        let record: PlaceRecord = serde_json::from_str(row).unwrap();
        let place = Place::project(record, Some(&UserId::from("u2")));

        assert_eq!(place.author, "Bob");
        assert_eq!(place.tags, vec!["trees".to_string()]);
        assert!(place.is_liked);
        assert_eq!(place.likes, 1);
    }

    #[test]
    fn candidate_is_trimmed_and_tags_are_split() {
        let owner = UserId::from("u1");
        let place = candidate().validate(&owner).unwrap();

        assert_eq!(place.name, "Sky Bar");
        assert_eq!(place.tags, vec!["view".to_string(), "cocktails".to_string()]);
        assert_eq!(place.image_url, None);
        assert_eq!(place.user_id, owner);
    }

    #[test]
    fn candidate_rejects_blank_fields_and_bad_ratings() {
        let owner = UserId::from("u1");

        let mut blank = candidate();
        blank.name = "   ".into();
        assert_eq!(
            blank.validate(&owner),
            Err(ValidationError::MissingField(Field::Name))
        );

        for rating in [0, 6, -1] {
            let mut bad = candidate();
            bad.rating = rating;
            assert_eq!(bad.validate(&owner), Err(ValidationError::InvalidRating(rating)));
        }
    }
}
