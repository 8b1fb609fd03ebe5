//! SQLite-backed catalog store.
//!
//! Writes go through a single connection guarded by a mutex, each one inside a
//! `BEGIN IMMEDIATE` transaction. Reads are spread round-robin over a small
//! pool of read-only connections, which WAL mode lets run alongside a writer.

use super::cascade::{cascade_delete, CascadeReport, EntityKind};
use super::error::{CatalogError, CatalogResult};
use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use super::validation::{validate_album, validate_artist, validate_track, Mode, ValidationError};
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const ARTIST_SELECT: &str = "SELECT id, name, grammy, hidden FROM artists";

const ALBUM_SELECT: &str = "SELECT al.id, al.artist_id, ar.name, al.name, al.year, al.hidden
     FROM albums al JOIN artists ar ON ar.id = al.artist_id";

const TRACK_SELECT: &str =
    "SELECT t.id, t.artist_id, ar.name, t.album_id, al.name, t.name, t.duration, t.hidden
     FROM tracks t
     JOIN artists ar ON ar.id = t.artist_id
     JOIN albums al ON al.id = t.album_id";

/// SQLite-backed catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

/// Ids are generated as UUIDs, anything else cannot name a stored row.
fn is_well_formed_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Accumulates `WHERE` clauses and their bound values for list queries.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, column: &str, value: Value) {
        self.values.push(value);
        self.clauses
            .push(format!("{} = ?{}", column, self.values.len()));
    }

    fn to_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Accumulates `SET` assignments for partial updates.
#[derive(Default)]
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    fn set(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    fn set_text(&mut self, column: &'static str, value: &Option<String>) {
        if let Some(v) = value {
            self.set(column, Value::Text(v.trim().to_string()));
        }
    }

    fn set_integer(&mut self, column: &'static str, value: Option<i64>) {
        if let Some(v) = value {
            self.set(column, Value::Integer(v));
        }
    }

    fn set_bool(&mut self, column: &'static str, value: Option<bool>) {
        if let Some(v) = value {
            self.set(column, Value::Integer(v as i64));
        }
    }

    /// Runs the update. Returns without touching the row when nothing was set.
    fn apply(self, conn: &Connection, table: &str, id: &str) -> rusqlite::Result<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let set_sql = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = self.values;
        values.push(Value::Text(id.to_string()));
        conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                table,
                set_sql,
                values.len()
            ),
            params_from_iter(values),
        )?;
        Ok(())
    }
}

fn row_exists(conn: &Connection, kind: EntityKind, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", kind.table()),
        params![id],
        |r| r.get(0),
    )
}

/// Fails with a foreign key violation unless `id` names an existing row.
fn require_referent(conn: &Connection, kind: EntityKind, id: &str) -> CatalogResult<()> {
    if is_well_formed_id(id) && row_exists(conn, kind, id)? {
        Ok(())
    } else {
        Err(ValidationError::ForeignKeyViolation {
            entity_type: kind.as_str(),
            id: id.to_string(),
        }
        .into())
    }
}

fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        grammy: row.get(2)?,
        hidden: row.get(3)?,
    })
}

fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        artist_name: row.get(2)?,
        name: row.get(3)?,
        year: row.get(4)?,
        hidden: row.get(5)?,
    })
}

fn parse_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        artist_name: row.get(2)?,
        album_id: row.get(3)?,
        album_name: row.get(4)?,
        name: row.get(5)?,
        duration: row.get(6)?,
        hidden: row.get(7)?,
    })
}

fn select_one<T>(
    conn: &Connection,
    select: &str,
    id_column: &str,
    id: &str,
    parse: fn(&rusqlite::Row) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    conn.query_row(
        &format!("{} WHERE {} = ?1", select, id_column),
        params![id],
        parse,
    )
    .optional()
}

fn select_page<T>(
    conn: &Connection,
    select: &str,
    conditions: Conditions,
    order_by: &str,
    page: PageRequest,
    parse: fn(&rusqlite::Row) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let sql = format!(
        "{}{} ORDER BY {} LIMIT {} OFFSET {}",
        select,
        conditions.to_sql(),
        order_by,
        page.limit,
        page.offset
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(conditions.values), parse)?;
    rows.collect()
}

impl SqliteCatalogStore {
    /// Open (creating if needed) the catalog database at `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `read_pool_size` - Number of connections for concurrent read operations
    /// * `busy_timeout` - How long a statement waits on a locked database
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        read_pool_size: usize,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;
        write_conn.busy_timeout(busy_timeout)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        migrate_if_needed(&mut write_conn, CATALOG_VERSIONED_SCHEMAS, "catalog")?;

        let count = |table: &str| -> i64 {
            write_conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap_or(0)
        };
        info!(
            "Opened catalog: {} artists, {} albums, {} tracks",
            count("artists"),
            count("albums"),
            count("tracks")
        );

        let read_pool_size = read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .context("Failed to open catalog read connection")?;
            read_conn.busy_timeout(busy_timeout)?;
            read_conn.pragma_update(None, "foreign_keys", "ON")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    /// Runs `f` inside `BEGIN IMMEDIATE` on the write connection, committing
    /// on success and rolling back on any error.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        match f(&*conn) {
            Ok(value) => match conn.execute("COMMIT", []) {
                Ok(_) => Ok(value),
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", []);
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn count(&self, table: &str) -> usize {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }

    fn delete(&self, kind: EntityKind, id: &str) -> CatalogResult<CascadeReport> {
        if !is_well_formed_id(id) {
            return Err(CatalogError::NotFound(kind));
        }
        let conn = self.write_conn.lock().unwrap();
        let report = cascade_delete(&conn, kind, id)?;
        info!(
            "Deleted {} {} ({} albums, {} tracks removed with it)",
            kind,
            id,
            report.removed(EntityKind::Album),
            report.removed(EntityKind::Track)
        );
        Ok(report)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_artist(&self, id: &str) -> CatalogResult<Option<Artist>> {
        if !is_well_formed_id(id) {
            return Ok(None);
        }
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_one(&conn, ARTIST_SELECT, "id", id, parse_artist_row)?)
    }

    fn get_album(&self, id: &str) -> CatalogResult<Option<Album>> {
        if !is_well_formed_id(id) {
            return Ok(None);
        }
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_one(&conn, ALBUM_SELECT, "al.id", id, parse_album_row)?)
    }

    fn get_track(&self, id: &str) -> CatalogResult<Option<Track>> {
        if !is_well_formed_id(id) {
            return Ok(None);
        }
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_one(&conn, TRACK_SELECT, "t.id", id, parse_track_row)?)
    }

    fn list_artists(&self, filter: &ArtistFilter, page: PageRequest) -> CatalogResult<Vec<Artist>> {
        let mut conditions = Conditions::default();
        if let Some(grammy) = filter.grammy {
            conditions.push("grammy", Value::Integer(grammy));
        }
        if let Some(hidden) = filter.hidden {
            conditions.push("hidden", Value::Integer(hidden as i64));
        }

        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_page(
            &conn,
            ARTIST_SELECT,
            conditions,
            "name ASC, id ASC",
            page,
            parse_artist_row,
        )?)
    }

    fn list_albums(&self, filter: &AlbumFilter, page: PageRequest) -> CatalogResult<Vec<Album>> {
        let mut conditions = Conditions::default();
        if let Some(artist_id) = &filter.artist_id {
            conditions.push("al.artist_id", Value::Text(artist_id.clone()));
        }
        if let Some(hidden) = filter.hidden {
            conditions.push("al.hidden", Value::Integer(hidden as i64));
        }

        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_page(
            &conn,
            ALBUM_SELECT,
            conditions,
            "al.year DESC, al.id ASC",
            page,
            parse_album_row,
        )?)
    }

    fn list_tracks(&self, filter: &TrackFilter, page: PageRequest) -> CatalogResult<Vec<Track>> {
        let mut conditions = Conditions::default();
        if let Some(artist_id) = &filter.artist_id {
            conditions.push("t.artist_id", Value::Text(artist_id.clone()));
        }
        if let Some(album_id) = &filter.album_id {
            conditions.push("t.album_id", Value::Text(album_id.clone()));
        }
        if let Some(hidden) = filter.hidden {
            conditions.push("t.hidden", Value::Integer(hidden as i64));
        }

        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Ok(select_page(
            &conn,
            TRACK_SELECT,
            conditions,
            "t.name ASC, t.id ASC",
            page,
            parse_track_row,
        )?)
    }

    fn get_artists_count(&self) -> usize {
        self.count("artists")
    }

    fn get_albums_count(&self) -> usize {
        self.count("albums")
    }

    fn get_tracks_count(&self) -> usize {
        self.count("tracks")
    }

    fn create_artist(&self, input: &ArtistInput) -> CatalogResult<Artist> {
        validate_artist(input, Mode::Create)?;
        let artist = Artist {
            id: Uuid::new_v4().to_string(),
            name: input.name.as_deref().unwrap_or_default().trim().to_string(),
            grammy: input.grammy.unwrap_or(0),
            hidden: input.hidden.unwrap_or(false),
        };

        self.write(|conn| {
            conn.execute(
                "INSERT INTO artists (id, name, grammy, hidden) VALUES (?1, ?2, ?3, ?4)",
                params![&artist.id, &artist.name, artist.grammy, artist.hidden],
            )?;
            Ok(())
        })?;
        info!("Created artist {} ({})", artist.id, artist.name);
        Ok(artist)
    }

    fn update_artist(&self, id: &str, input: &ArtistInput) -> CatalogResult<()> {
        if !is_well_formed_id(id) {
            return Err(CatalogError::NotFound(EntityKind::Artist));
        }
        validate_artist(input, Mode::Update)?;

        self.write(|conn| {
            if !row_exists(conn, EntityKind::Artist, id)? {
                return Err(CatalogError::NotFound(EntityKind::Artist));
            }
            let mut assignments = Assignments::default();
            assignments.set_text("name", &input.name);
            assignments.set_integer("grammy", input.grammy);
            assignments.set_bool("hidden", input.hidden);
            assignments.apply(conn, "artists", id)?;
            Ok(())
        })
    }

    fn delete_artist(&self, id: &str) -> CatalogResult<CascadeReport> {
        self.delete(EntityKind::Artist, id)
    }

    fn create_album(&self, input: &AlbumInput) -> CatalogResult<Album> {
        validate_album(input, Mode::Create)?;
        let id = Uuid::new_v4().to_string();
        let artist_id = input.artist_id.as_deref().unwrap_or_default().trim();

        let album = self.write(|conn| {
            require_referent(conn, EntityKind::Artist, artist_id)?;
            conn.execute(
                "INSERT INTO albums (id, name, artist_id, year, hidden) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &id,
                    input.name.as_deref().unwrap_or_default().trim(),
                    artist_id,
                    input.year.unwrap_or_default(),
                    input.hidden.unwrap_or(false)
                ],
            )?;
            select_one(conn, ALBUM_SELECT, "al.id", &id, parse_album_row)?
                .ok_or(CatalogError::NotFound(EntityKind::Album))
        })?;
        info!("Created album {} ({})", album.id, album.name);
        Ok(album)
    }

    fn update_album(&self, id: &str, input: &AlbumInput) -> CatalogResult<()> {
        if !is_well_formed_id(id) {
            return Err(CatalogError::NotFound(EntityKind::Album));
        }
        validate_album(input, Mode::Update)?;

        self.write(|conn| {
            if !row_exists(conn, EntityKind::Album, id)? {
                return Err(CatalogError::NotFound(EntityKind::Album));
            }
            if let Some(artist_id) = &input.artist_id {
                require_referent(conn, EntityKind::Artist, artist_id.trim())?;
            }
            let mut assignments = Assignments::default();
            assignments.set_text("name", &input.name);
            assignments.set_text("artist_id", &input.artist_id);
            assignments.set_integer("year", input.year);
            assignments.set_bool("hidden", input.hidden);
            assignments.apply(conn, "albums", id)?;
            Ok(())
        })
    }

    fn delete_album(&self, id: &str) -> CatalogResult<CascadeReport> {
        self.delete(EntityKind::Album, id)
    }

    fn create_track(&self, input: &TrackInput) -> CatalogResult<Track> {
        validate_track(input, Mode::Create)?;
        let id = Uuid::new_v4().to_string();
        let artist_id = input.artist_id.as_deref().unwrap_or_default().trim();
        let album_id = input.album_id.as_deref().unwrap_or_default().trim();

        let track = self.write(|conn| {
            require_referent(conn, EntityKind::Artist, artist_id)?;
            require_referent(conn, EntityKind::Album, album_id)?;
            conn.execute(
                "INSERT INTO tracks (id, name, artist_id, album_id, duration, hidden)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &id,
                    input.name.as_deref().unwrap_or_default().trim(),
                    artist_id,
                    album_id,
                    input.duration.unwrap_or_default(),
                    input.hidden.unwrap_or(false)
                ],
            )?;
            select_one(conn, TRACK_SELECT, "t.id", &id, parse_track_row)?
                .ok_or(CatalogError::NotFound(EntityKind::Track))
        })?;
        info!("Created track {} ({})", track.id, track.name);
        Ok(track)
    }

    fn update_track(&self, id: &str, input: &TrackInput) -> CatalogResult<()> {
        if !is_well_formed_id(id) {
            return Err(CatalogError::NotFound(EntityKind::Track));
        }
        validate_track(input, Mode::Update)?;

        self.write(|conn| {
            if !row_exists(conn, EntityKind::Track, id)? {
                return Err(CatalogError::NotFound(EntityKind::Track));
            }
            if let Some(artist_id) = &input.artist_id {
                require_referent(conn, EntityKind::Artist, artist_id.trim())?;
            }
            if let Some(album_id) = &input.album_id {
                require_referent(conn, EntityKind::Album, album_id.trim())?;
            }
            let mut assignments = Assignments::default();
            assignments.set_text("name", &input.name);
            assignments.set_text("artist_id", &input.artist_id);
            assignments.set_text("album_id", &input.album_id);
            assignments.set_integer("duration", input.duration);
            assignments.set_bool("hidden", input.hidden);
            assignments.apply(conn, "tracks", id)?;
            Ok(())
        })
    }

    fn delete_track(&self, id: &str) -> CatalogResult<CascadeReport> {
        self.delete(EntityKind::Track, id)
    }
}
