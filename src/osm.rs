//! Reverse geocoding against an OpenStreetMap Nominatim compatible endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ValidationError;

const USER_AGENT: &str = concat!("placeshare/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let in_range = (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon);

        if !in_range {
            return Err(ValidationError::InvalidCoordinates {
                lat: self.lat,
                lon: self.lon,
            });
        }

        Ok(self)
    }

    pub fn label(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Geocoder, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Geocoder {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Best-effort address for `at`. Any failure is logged and yields `None`.
    pub async fn reverse(&self, at: Coordinates) -> Option<String> {
        match self.lookup(at).await {
            Ok(address) => address,
            Err(e) => {
                warn!(lat = at.lat, lon = at.lon, "Reverse geocoding failed: {e}");
                None
            }
        }
    }

    async fn lookup(&self, at: Coordinates) -> Result<Option<String>, reqwest::Error> {
        let response: Value = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let address = display_name(&response);
        debug!(?address, "Reverse geocoded");
        Ok(address)
    }

    /// Location text for a place picked on the map: the geocoded address, else
    /// the text already entered, else the coordinates themselves.
    pub async fn resolve_location(
        &self,
        selection: Option<Coordinates>,
        current: &str,
    ) -> Result<String, ValidationError> {
        let at = selection.ok_or(ValidationError::MissingLocation)?.validate()?;

        if let Some(address) = self.reverse(at).await {
            return Ok(address);
        }

        let current = current.trim();

        if current.is_empty() {
            Ok(at.label())
        } else {
            Ok(current.to_string())
        }
    }
}

fn display_name(response: &Value) -> Option<String> {
    response["display_name"]
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
