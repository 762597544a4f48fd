use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::db::{self, constraint_code, place_mapper};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::model::{Credentials, LikeKey, LikeRef, NewAccount, NewPlace, NewReport, PlaceRecord, UserId};

const DEFAULT_IMAGE_BASE: &str = "/images";

/// SQLite-backed gateway with the same collections and constraint codes as the hosted backend.
///
/// There are no passwords in the local `profiles` table: signing in resolves the
/// profile by email only, so this backend is meant for development and tests.
pub struct PlaceRepository {
    conn: Mutex<Connection>,
    viewer: Mutex<Option<UserId>>,
    image_base: String,
}

impl PlaceRepository {
    pub fn new(conn: Connection) -> Result<PlaceRepository, GatewayError> {
        db::migrate(&conn)?;

        Ok(PlaceRepository {
            conn: Mutex::new(conn),
            viewer: Mutex::new(None),
            image_base: DEFAULT_IMAGE_BASE.to_string(),
        })
    }

    pub fn open(path: &Path) -> Result<PlaceRepository, GatewayError> {
        PlaceRepository::new(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<PlaceRepository, GatewayError> {
        PlaceRepository::new(db::open_in_memory()?)
    }

    pub fn with_image_base(mut self, image_base: impl Into<String>) -> Self {
        self.image_base = image_base.into();
        self
    }

    pub async fn select_all(&self) -> Result<Vec<PlaceRecord>, GatewayError> {
        let conn = self.conn.lock().await;
        Ok(select_records(&conn)?)
    }

    pub async fn report_count(&self, place_id: &str) -> Result<u32, GatewayError> {
        let conn = self.conn.lock().await;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM place_reports WHERE place_id = ?",
            params![place_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Content type and bytes of an uploaded image.
    pub async fn image(&self, name: &str) -> Result<Option<(String, Vec<u8>)>, GatewayError> {
        let conn = self.conn.lock().await;
        let image = conn
            .query_row(
                "SELECT content_type, bytes FROM place_images WHERE name = ?",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(image)
    }
}

fn select_records(conn: &Connection) -> rusqlite::Result<Vec<PlaceRecord>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.type, p.location, p.description, p.rating, p.image_url, p.tags, \
         p.user_id, p.created_at, p.updated_at, pr.id, pr.display_name \
         FROM places p LEFT JOIN profiles pr ON pr.id = p.user_id \
         ORDER BY p.created_at DESC, p.rowid DESC",
    )?;

    let rows = stmt.query_map([], place_mapper())?;

    let mut places: Vec<PlaceRecord> = Vec::new();

    for place in rows {
        places.push(place?);
    }

    let mut stmt = conn.prepare("SELECT place_id, user_id FROM place_likes ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut likes: HashMap<String, Vec<LikeRef>> = HashMap::new();

    for like in rows {
        let (place_id, user_id) = like?;
        likes.entry(place_id).or_default().push(LikeRef {
            user_id: user_id.into(),
        });
    }

    for place in &mut places {
        place.place_likes = Some(likes.remove(&place.id).unwrap_or_default());
    }

    Ok(places)
}

fn reject(err: rusqlite::Error) -> GatewayError {
    match constraint_code(&err) {
        Some(code) => GatewayError::rejected(code, err.to_string()),
        None => GatewayError::Storage(err),
    }
}

#[async_trait]
impl Gateway for PlaceRepository {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_places(&self) -> Result<Vec<PlaceRecord>, GatewayError> {
        self.select_all().await
    }

    async fn insert_place(&self, place: &NewPlace) -> Result<(), GatewayError> {
        let id = Uuid::new_v4().to_string();
        let tags = serde_json::to_string(&place.tags)?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO places (id, name, type, location, description, rating, tags, image_url, user_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                place.name,
                place.kind,
                place.location,
                place.description,
                place.rating,
                tags,
                place.image_url,
                place.user_id.as_str(),
            ],
        )
        .map_err(reject)?;

        debug!(%id, "Inserted place");
        Ok(())
    }

    async fn insert_like(&self, like: &LikeKey) -> Result<(), GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO place_likes (place_id, user_id) VALUES (?, ?)",
            params![like.place_id, like.user_id.as_str()],
        )
        .map_err(reject)?;
        Ok(())
    }

    async fn delete_like(&self, like: &LikeKey) -> Result<(), GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM place_likes WHERE place_id = ? AND user_id = ?",
            params![like.place_id, like.user_id.as_str()],
        )
        .map_err(reject)?;
        Ok(())
    }

    async fn insert_report(&self, report: &NewReport) -> Result<(), GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO place_reports (place_id, user_id, reason) VALUES (?, ?, ?)",
            params![report.place_id, report.user_id.as_str(), report.reason],
        )
        .map_err(reject)?;
        Ok(())
    }

    async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO place_images (name, content_type, bytes) VALUES (?, ?, ?)",
            params![file_name, content_type, bytes],
        )
        .map_err(reject)?;
        Ok(format!("{}/{}", self.image_base, file_name))
    }

    async fn sign_up(&self, account: &NewAccount) -> Result<UserId, GatewayError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO profiles (id, email, display_name) VALUES (?, ?, ?)",
            params![
                id,
                account.credentials.email.trim(),
                account.display_name.trim()
            ],
        )
        .map_err(reject)?;
        Ok(id.into())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, GatewayError> {
        let id: Option<String> = {
            let conn = self.conn.lock().await;
            conn.query_row(
                "SELECT id FROM profiles WHERE email = ?",
                params![credentials.email.trim()],
                |row| row.get(0),
            )
            .optional()?
        };

        let id: UserId = id
            .ok_or_else(|| GatewayError::rejected("invalid_credentials", "unknown email"))?
            .into();

        *self.viewer.lock().await = Some(id.clone());
        Ok(id)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        *self.viewer.lock().await = None;
        Ok(())
    }

    async fn current_viewer(&self) -> Result<Option<UserId>, GatewayError> {
        Ok(self.viewer.lock().await.clone())
    }
}
