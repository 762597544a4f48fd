//! Place sharing: browse, search, add, like and report places kept in a hosted backend.
//!
//! [sync::PlaceStore] owns the session's place list and mediates every write to the
//! [gateway::Gateway]; [view] derives what to show from that list.

pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notice;
pub mod osm;
pub mod remote;
pub mod repository;
pub mod sync;
pub mod view;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub fn get_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "PlaceShare", "placeshare")
        .ok_or_else(|| anyhow!("Unable to resolve a home directory"))
}
