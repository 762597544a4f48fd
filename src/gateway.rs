//! Boundary to the hosted backend: relational collections, auth and object storage.
//!
//! [crate::remote::RemoteGateway] talks to the hosted service over HTTP,
//! [crate::repository::PlaceRepository] keeps the same collections in a local SQLite file.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{Credentials, LikeKey, NewAccount, NewPlace, NewReport, PlaceRecord, UserId};

#[async_trait]
pub trait Gateway: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// All places joined with their owner's display name and like records, newest first.
    async fn fetch_places(&self) -> Result<Vec<PlaceRecord>, GatewayError>;

    async fn insert_place(&self, place: &NewPlace) -> Result<(), GatewayError>;

    /// Fails with a unique violation when the viewer already liked the place.
    async fn insert_like(&self, like: &LikeKey) -> Result<(), GatewayError>;

    async fn delete_like(&self, like: &LikeKey) -> Result<(), GatewayError>;

    /// Fails with a unique violation when the viewer already reported the place.
    async fn insert_report(&self, report: &NewReport) -> Result<(), GatewayError>;

    /// Stores `bytes` under `file_name` and returns a publicly resolvable URL.
    async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GatewayError>;

    async fn sign_up(&self, account: &NewAccount) -> Result<UserId, GatewayError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, GatewayError>;

    async fn sign_out(&self) -> Result<(), GatewayError>;

    async fn current_viewer(&self) -> Result<Option<UserId>, GatewayError>;
}
