//! Session-scoped place list, kept in step with the gateway.
//!
//! Every mutation goes to the gateway first and is followed by a full refetch;
//! the local list is never patched in place. Fetches may overlap: each one takes
//! a ticket when it is issued and its response is applied only if no newer fetch
//! has been applied already, so the list always reflects the most recently issued
//! successful fetch. Changing the viewer retires every fetch issued before the change.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Action, GatewayError, StoreError};
use crate::gateway::Gateway;
use crate::model::{Credentials, LikeKey, NewAccount, NewPlace, NewReport, Place, PlaceCandidate, UserId};
use crate::notice::Notice;

const NOTICE_CAPACITY: usize = 64;

pub struct PlaceStore {
    gateway: Arc<dyn Gateway>,
    session: RwLock<Session>,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    notices: broadcast::Sender<Notice>,
}

#[derive(Default)]
struct Session {
    places: Vec<Place>,
    viewer: Option<UserId>,
    applied: u64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LikeChange {
    Liked,
    Unliked,
    /// The like already existed remotely; nothing was written.
    Unchanged,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Sent,
    AlreadyReported,
}

/// Counts a fetch as outstanding until dropped, including when the fetch future is cancelled.
struct Loading<'a>(&'a AtomicUsize);

impl<'a> Loading<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Loading(counter)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PlaceStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        PlaceStore {
            gateway,
            session: RwLock::new(Session::default()),
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            notices,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn places(&self) -> Vec<Place> {
        self.session.read().await.places.clone()
    }

    pub async fn viewer(&self) -> Option<UserId> {
        self.session.read().await.viewer.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Replaces the list with a fresh projection of every place. On failure the
    /// previous list is kept.
    pub async fn fetch_all(&self) -> Result<(), StoreError> {
        let _loading = Loading::start(&self.in_flight);

        let (ticket, viewer) = {
            let session = self.session.read().await;
            (
                self.issued.fetch_add(1, Ordering::SeqCst) + 1,
                session.viewer.clone(),
            )
        };

        let records = match self.gateway.fetch_places().await {
            Ok(records) => records,
            Err(err) => {
                self.publish(Notice::LoadFailed {
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let mut session = self.session.write().await;

        if ticket <= session.applied {
            debug!(ticket, applied = session.applied, "Discarding stale place list");
            return Ok(());
        }

        session.applied = ticket;
        session.places = records
            .into_iter()
            .map(|record| Place::project(record, viewer.as_ref()))
            .collect();

        debug!(ticket, count = session.places.len(), "Applied place list");
        Ok(())
    }

    /// Same as [PlaceStore::submit], reporting only whether the place was added.
    pub async fn add(&self, candidate: PlaceCandidate) -> bool {
        self.submit(candidate).await.is_ok()
    }

    pub async fn submit(&self, candidate: PlaceCandidate) -> Result<(), StoreError> {
        let place = self
            .insert_candidate(candidate)
            .await
            .map_err(|err| self.fail(Action::AddPlace, err))?;

        info!(name = %place.name, "Place added");
        self.publish(Notice::PlaceAdded { name: place.name });
        self.resync().await;
        Ok(())
    }

    async fn insert_candidate(&self, candidate: PlaceCandidate) -> Result<NewPlace, StoreError> {
        let viewer = self.require_viewer(Action::AddPlace).await?;
        let place = candidate.validate(&viewer)?;
        self.gateway.insert_place(&place).await?;
        Ok(place)
    }

    pub async fn toggle_like(&self, place_id: &str) -> Result<LikeChange, StoreError> {
        let change = self
            .apply_like(place_id)
            .await
            .map_err(|err| self.fail(Action::Like, err))?;

        debug!(place_id, ?change, "Like toggled");
        self.resync().await;
        Ok(change)
    }

    async fn apply_like(&self, place_id: &str) -> Result<LikeChange, StoreError> {
        let viewer = self.require_viewer(Action::Like).await?;

        let liked = self
            .session
            .read()
            .await
            .places
            .iter()
            .find(|place| place.id == place_id)
            .map(|place| place.is_liked)
            .ok_or_else(|| StoreError::UnknownPlace(place_id.to_string()))?;

        let like = LikeKey {
            place_id: place_id.to_string(),
            user_id: viewer,
        };

        if liked {
            self.gateway.delete_like(&like).await?;
            return Ok(LikeChange::Unliked);
        }

        match self.gateway.insert_like(&like).await {
            Ok(()) => Ok(LikeChange::Liked),
            Err(err) if err.is_unique_violation() => Ok(LikeChange::Unchanged),
            Err(err) => Err(err.into()),
        }
    }

    /// Reports do not change any displayed field, so there is no refetch.
    pub async fn report(
        &self,
        place_id: &str,
        reason: Option<String>,
    ) -> Result<ReportOutcome, StoreError> {
        let outcome = self
            .send_report(place_id, reason)
            .await
            .map_err(|err| self.fail(Action::Report, err))?;

        self.publish(match outcome {
            ReportOutcome::Sent => Notice::ReportSent,
            ReportOutcome::AlreadyReported => Notice::AlreadyReported,
        });
        Ok(outcome)
    }

    async fn send_report(
        &self,
        place_id: &str,
        reason: Option<String>,
    ) -> Result<ReportOutcome, StoreError> {
        let viewer = self.require_viewer(Action::Report).await?;

        let report = NewReport {
            place_id: place_id.to_string(),
            user_id: viewer,
            reason: reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
        };

        match self.gateway.insert_report(&report).await {
            Ok(()) => Ok(ReportOutcome::Sent),
            Err(err) if err.is_unique_violation() => Ok(ReportOutcome::AlreadyReported),
            Err(err) => Err(err.into()),
        }
    }

    /// Uploads a photo under a fresh unique name and returns its public URL.
    pub async fn upload_photo(&self, original_name: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let extension = extension_of(original_name);
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);

        let url = self
            .gateway
            .upload_image(&file_name, content_type(&extension), bytes)
            .await
            .map_err(|err| self.fail(Action::UploadPhoto, err.into()))?;

        self.publish(Notice::PhotoUploaded { url: url.clone() });
        Ok(url)
    }

    pub async fn sign_up(&self, account: &NewAccount) -> Result<UserId, StoreError> {
        account
            .validate()
            .map_err(|err| self.fail(Action::SignUp, err.into()))?;

        let id = self
            .gateway
            .sign_up(account)
            .await
            .map_err(|err| self.fail(Action::SignUp, err.into()))?;

        self.publish(Notice::AccountCreated);
        Ok(id)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, StoreError> {
        credentials
            .validate()
            .map_err(|err| self.fail(Action::SignIn, err.into()))?;

        let viewer = self
            .gateway
            .sign_in(credentials)
            .await
            .map_err(|err| {
                let err = match err {
                    GatewayError::Rejected { .. } => StoreError::CredentialsRejected(err),
                    err => err.into(),
                };
                self.fail(Action::SignIn, err)
            })?;

        info!(%viewer, "Signed in");
        self.set_viewer(Some(viewer.clone())).await;
        self.publish(Notice::SignedIn);
        self.resync().await;
        Ok(viewer)
    }

    /// Clears the viewer locally even when the gateway call fails.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        let result = self.gateway.sign_out().await;
        self.set_viewer(None).await;

        result.map_err(|err| self.fail(Action::SignOut, err.into()))
    }

    /// Picks up an identity the gateway already holds, then loads the list for it.
    pub async fn restore_session(&self) -> Result<Option<UserId>, StoreError> {
        let viewer = self
            .gateway
            .current_viewer()
            .await
            .map_err(|err| self.fail(Action::SignIn, err.into()))?;

        self.set_viewer(viewer.clone()).await;
        self.resync().await;
        Ok(viewer)
    }

    async fn set_viewer(&self, viewer: Option<UserId>) {
        let mut session = self.session.write().await;

        if session.viewer == viewer {
            return;
        }

        session.applied = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        session.viewer = viewer;

        for place in session.places.iter_mut() {
            place.is_liked = false;
        }
    }

    async fn require_viewer(&self, action: Action) -> Result<UserId, StoreError> {
        self.session
            .read()
            .await
            .viewer
            .clone()
            .ok_or(StoreError::SignInRequired(action))
    }

    /// Failures are already published by [PlaceStore::fetch_all].
    async fn resync(&self) {
        if let Err(err) = self.fetch_all().await {
            debug!(%err, "Resync failed");
        }
    }

    fn fail(&self, action: Action, err: StoreError) -> StoreError {
        let notice = match &err {
            StoreError::SignInRequired(action) => Notice::sign_in_required(*action),
            StoreError::Invalid(invalid) => Notice::invalid(invalid),
            StoreError::UnknownPlace(_)
            | StoreError::CredentialsRejected(_)
            | StoreError::Gateway(_) => {
                Notice::action_failed(action, &err)
            }
        };

        self.publish(notice);
        err
    }

    fn publish(&self, notice: Notice) {
        if notice.is_error() {
            warn!(%notice, "Notice");
        } else {
            info!(%notice, "Notice");
        }

        // no subscribers is fine
        let _ = self.notices.send(notice);
    }
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .filter(|extension| {
            !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "jpg".to_string())
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}
