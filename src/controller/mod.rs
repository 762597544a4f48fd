//! JSON routes over a single [PlaceStore]. The facade is single-session: every
//! client shares one viewer, and whoever signs in last is the viewer for all callers.

pub mod image;
pub mod place;

use std::sync::Arc;

use actix_web::web;

use crate::osm::Geocoder;
use crate::sync::PlaceStore;

const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub store: Arc<PlaceStore>,
    pub geocoder: Geocoder,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_PHOTO_BYTES))
        .service(place::get_categories)
        .service(place::get_listing)
        .service(place::get_places)
        .service(place::refresh_places)
        .service(place::add_place)
        .service(place::toggle_like)
        .service(place::report_place)
        .service(place::sign_up)
        .service(place::get_session)
        .service(place::sign_in)
        .service(place::sign_out)
        .service(place::upload_photo)
        .service(place::reverse_geocode)
        .service(place::resolve_location);
}

/// Routes that only exist for the local SQLite gateway.
pub fn configure_local(cfg: &mut web::ServiceConfig) {
    cfg.service(image::get_image);
}
