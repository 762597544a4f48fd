use std::fs::remove_file;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::types::Type;
use rusqlite::{ffi, Connection, Row};
use tracing::info;

use crate::error::{CHECK_VIOLATION, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use crate::model::{PlaceRecord, ProfileRef};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT
);

CREATE TABLE IF NOT EXISTS places (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    location TEXT NOT NULL,
    description TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    tags TEXT NOT NULL DEFAULT '[]',
    image_url TEXT,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS place_likes (
    place_id TEXT NOT NULL REFERENCES places (id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    PRIMARY KEY (place_id, user_id)
);

CREATE TABLE IF NOT EXISTS place_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    place_id TEXT NOT NULL REFERENCES places (id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    reason TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE (place_id, user_id)
);

CREATE TABLE IF NOT EXISTS place_images (
    name TEXT PRIMARY KEY,
    content_type TEXT NOT NULL,
    bytes BLOB NOT NULL
);
"#;

pub fn cli_main(args: &[String], db_path: &Path) -> Result<()> {
    match args.first() {
        None => println!("No options passed"),
        Some(first_arg) => match first_arg.as_str() {
            "init" => init(db_path).context("Unable to initialize database")?,
            "drop" => drop(db_path).context("Unable to drop database")?,
            _ => println!("Unknown command {first_arg}"),
        },
    }

    Ok(())
}

fn init(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    open(db_path)?;
    println!("Database is ready at {}", db_path.display());

    Ok(())
}

fn drop(db_path: &Path) -> Result<()> {
    println!("Removing {}", db_path.display());

    if !db_path.exists() {
        bail!("Database does not exist");
    }

    remove_file(db_path)?;
    println!("Database has been dropped");

    Ok(())
}

pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    info!(path = %path.display(), "Opened place database");
    Ok(conn)
}

pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)
}

/// Columns: id, name, type, location, description, rating, image_url, tags,
/// user_id, created_at, updated_at, profile id, profile display_name.
pub fn place_mapper() -> impl FnMut(&Row) -> rusqlite::Result<PlaceRecord> {
    |row: &Row| -> rusqlite::Result<PlaceRecord> {
        let tags: String = row.get(7)?;
        let tags: Vec<String> = serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        let profile_id: Option<String> = row.get(11)?;

        Ok(PlaceRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            location: row.get(3)?,
            description: row.get(4)?,
            rating: row.get(5)?,
            image_url: row.get(6)?,
            tags: Some(tags),
            user_id: row.get::<_, String>(8)?.into(),
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            profiles: match profile_id {
                Some(_) => Some(ProfileRef {
                    display_name: row.get(12)?,
                }),
                None => None,
            },
            place_likes: None,
        })
    }
}

/// Maps SQLite constraint failures onto the PostgreSQL codes the hosted gateway reports.
pub fn constraint_code(err: &rusqlite::Error) -> Option<&'static str> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Some(UNIQUE_VIOLATION)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(FOREIGN_KEY_VIOLATION),
            ffi::SQLITE_CONSTRAINT_CHECK => Some(CHECK_VIOLATION),
            _ => None,
        },
        _ => None,
    }
}
