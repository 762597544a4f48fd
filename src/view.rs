//! Filtering of the synchronized list for display. Pure and cheap enough to run on every input change.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Place;

/// Category filter value that matches every place.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Kind(String),
}

impl CategoryFilter {
    pub fn matches(&self, place: &Place) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Kind(kind) => &place.kind == kind,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "" | ALL_CATEGORIES => CategoryFilter::All,
            kind => CategoryFilter::Kind(kind.to_string()),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Grid,
    Map,
}

/// Inputs of the main listing.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub query: String,
    pub filter: CategoryFilter,
    pub mode: ViewMode,
}

impl ViewState {
    pub fn visible<'a>(&self, places: &'a [Place]) -> Vec<&'a Place> {
        visible_places(places, &self.query, &self.filter)
    }

    pub fn is_filtered(&self) -> bool {
        !self.query.is_empty() || self.filter != CategoryFilter::All
    }
}

pub fn matches_query(place: &Place, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let query = query.to_lowercase();
    let contains = |text: &str| text.to_lowercase().contains(&query);

    contains(&place.name)
        || contains(&place.location)
        || contains(&place.description)
        || place.tags.iter().any(|tag| contains(tag))
}

/// Places matching both the query and the filter, in input order.
pub fn visible_places<'a>(
    places: &'a [Place],
    query: &str,
    filter: &CategoryFilter,
) -> Vec<&'a Place> {
    places
        .iter()
        .filter(|place| matches_query(place, query) && filter.matches(place))
        .collect()
}

/// [ALL_CATEGORIES] followed by each distinct place type in first-seen order.
pub fn categories(places: &[Place]) -> Vec<String> {
    let mut categories = vec![ALL_CATEGORIES.to_string()];

    for place in places {
        if !categories[1..].contains(&place.kind) {
            categories.push(place.kind.clone());
        }
    }

    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, kind: &str, name: &str) -> Place {
        Place {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            location: "Paris".into(),
            rating: 4,
            description: "Somewhere".into(),
            image: "/placeholder.svg".into(),
            author: "Anonymous user".into(),
            likes: 0,
            comments: 0,
            tags: vec![],
            is_liked: false,
        }
    }

    fn pair() -> Vec<Place> {
        vec![place("a", "Café", "Le Central"), place("b", "Bar", "Sky Bar")]
    }

    fn ids(places: Vec<&Place>) -> Vec<&str> {
        places.into_iter().map(|place| place.id.as_str()).collect()
    }

    #[test]
    fn empty_query_and_all_filter_keep_everything_in_order() {
        let places = pair();
        assert_eq!(ids(visible_places(&places, "", &CategoryFilter::All)), vec!["a", "b"]);
    }

    #[test]
    fn query_is_a_case_insensitive_substring_match() {
        let places = pair();
        assert_eq!(ids(visible_places(&places, "central", &CategoryFilter::All)), vec!["a"]);
        assert_eq!(ids(visible_places(&places, "SKY", &CategoryFilter::All)), vec!["b"]);
    }

    #[test]
    fn filter_matches_type_exactly() {
        let places = pair();
        let bar: CategoryFilter = "Bar".parse().unwrap();

        assert_eq!(ids(visible_places(&places, "", &bar)), vec!["b"]);
        assert!(visible_places(&places, "", &"bar".parse().unwrap()).is_empty());
    }

    #[test]
    fn query_reaches_location_description_and_tags() {
        let mut places = pair();
        places[0].location = "Lyon".into();
        places[1].description = "Rooftop cocktails".into();
        places[1].tags = vec!["Vue".into(), "Terrasse".into()];

        let all = CategoryFilter::All;
        assert_eq!(ids(visible_places(&places, "lyon", &all)), vec!["a"]);
        assert_eq!(ids(visible_places(&places, "rooftop", &all)), vec!["b"]);
        assert_eq!(ids(visible_places(&places, "terr", &all)), vec!["b"]);
        assert!(visible_places(&places, "nowhere", &all).is_empty());
    }

    #[test]
    fn query_and_filter_combine() {
        let places = pair();
        let cafe = CategoryFilter::Kind("Café".into());

        assert!(visible_places(&places, "sky", &cafe).is_empty());
        assert_eq!(ids(visible_places(&places, "le", &cafe)), vec!["a"]);
    }

    #[test]
    fn categories_start_with_all_then_first_seen_types() {
        let places = vec![
            place("a", "Bar", "One"),
            place("b", "Café", "Two"),
            place("c", "Bar", "Three"),
            place("d", "Parc", "Four"),
        ];

        assert_eq!(categories(&places), vec!["all", "Bar", "Café", "Parc"]);
        assert_eq!(categories(&[]), vec!["all"]);
    }

    #[test]
    fn view_state_bundles_inputs() {
        let places = pair();
        let state = ViewState {
            query: "bar".into(),
            filter: "all".parse().unwrap(),
            mode: ViewMode::Map,
        };

        assert!(state.is_filtered());
        assert_eq!(ids(state.visible(&places)), vec!["b"]);
        assert!(!ViewState::default().is_filtered());
    }
}
