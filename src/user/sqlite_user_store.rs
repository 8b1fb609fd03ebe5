use super::auth::{PasswordCredentials, PasswordHasher};
use super::favorites::{Favorite, FavoriteCategory, FavoriteTarget};
use super::permissions::UserRole;
use super::user_models::{normalize_email, User, UserUpdateOutcome};
use super::user_store::{FavoritesStore, UserCredentialsStore, UserStore};
use crate::catalog_store::PageRequest;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_email", "email"), ("idx_user_role", "role")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[],
};
const FAVORITE_TABLE_V_0: Table = Table {
    name: "favorite",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("item_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "category", "item_id"]],
    indices: &[("idx_favorite_user_id", "user_id")],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_V_0,
        FAVORITE_TABLE_V_0,
    ],
    migration: None,
}];

const USER_SELECT: &str = "SELECT id, email, role, created FROM user";

const FAVORITE_SELECT: &str = "SELECT id, user_id, category, item_id, name, created FROM favorite";

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        role: UserRole::from_str(&role)
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(2, "role".into(), Type::Text))?,
        created: row.get(3)?,
    })
}

fn parse_favorite_row(row: &rusqlite::Row) -> rusqlite::Result<Favorite> {
    let category: String = row.get(2)?;
    let category = FavoriteCategory::from_str(&category)
        .map_err(|_| rusqlite::Error::InvalidColumnType(2, "category".into(), Type::Text))?;
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target: FavoriteTarget::new(category, row.get::<_, String>(3)?),
        name: row.get(4)?,
        created: row.get(5)?,
    })
}

fn select_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("{} WHERE {} = ?1", USER_SELECT, column),
            params![value],
            parse_user_row,
        )
        .optional()?)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T, busy_timeout: Duration) -> Result<Self> {
        let mut conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open user database")?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrate_if_needed(&mut conn, USER_VERSIONED_SCHEMAS, "user")?;

        let users: i64 = conn.query_row("SELECT COUNT(*) FROM user", [], |r| r.get(0))?;
        info!("Opened user db with {} users", users);

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` inside `BEGIN IMMEDIATE`, committing on success.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
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
}

impl UserCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, user_id: &str) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT salt, hash, hasher FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((salt, hash, hasher)) => Ok(Some(PasswordCredentials {
                salt,
                hash,
                hasher: PasswordHasher::from_str(&hasher)?,
            })),
        }
    }

    fn update_password_credentials(
        &self,
        user_id: &str,
        credentials: &PasswordCredentials,
    ) -> Result<bool> {
        self.write(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM user WHERE id = ?1)",
                params![user_id],
                |r| r.get(0),
            )?;
            if !exists {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO user_password_credentials (user_id, salt, hash, hasher)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
                params![
                    user_id,
                    &credentials.salt,
                    &credentials.hash,
                    credentials.hasher.to_string()
                ],
            )?;
            Ok(true)
        })
    }
}

impl FavoritesStore for SqliteUserStore {
    fn add_favorite(
        &self,
        user_id: &str,
        target: &FavoriteTarget,
        name: &str,
    ) -> Result<Option<Favorite>> {
        self.write(|conn| {
            let duplicate: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM favorite
                 WHERE user_id = ?1 AND category = ?2 AND item_id = ?3)",
                params![user_id, target.category().as_str(), target.item_id()],
                |r| r.get(0),
            )?;
            if duplicate {
                return Ok(None);
            }

            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO favorite (id, user_id, category, item_id, name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &id,
                    user_id,
                    target.category().as_str(),
                    target.item_id(),
                    name
                ],
            )?;
            Ok(conn
                .query_row(
                    &format!("{} WHERE id = ?1", FAVORITE_SELECT),
                    params![&id],
                    parse_favorite_row,
                )
                .optional()?)
        })
    }

    fn get_favorite(&self, favorite_id: &str) -> Result<Option<Favorite>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("{} WHERE id = ?1", FAVORITE_SELECT),
                params![favorite_id],
                parse_favorite_row,
            )
            .optional()?)
    }

    fn remove_favorite(&self, favorite_id: &str) -> Result<bool> {
        self.write(|conn| {
            let deleted =
                conn.execute("DELETE FROM favorite WHERE id = ?1", params![favorite_id])?;
            Ok(deleted == 1)
        })
    }

    fn list_favorites(
        &self,
        user_id: &str,
        category: FavoriteCategory,
        page: PageRequest,
    ) -> Result<Vec<Favorite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "{} WHERE user_id = ?1 AND category = ?2
             ORDER BY created DESC, rowid DESC LIMIT ?3 OFFSET ?4",
            FAVORITE_SELECT
        ))?;
        let rows = stmt.query_map(
            params![
                user_id,
                category.as_str(),
                page.limit as i64,
                page.offset as i64
            ],
            parse_favorite_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(
        &self,
        email: &str,
        credentials: &PasswordCredentials,
        role: Option<UserRole>,
    ) -> Result<Option<User>> {
        let email = normalize_email(email);
        let user = self.write(|conn| {
            if select_user(conn, "email", &email)?.is_some() {
                return Ok(None);
            }

            let existing: i64 = conn.query_row("SELECT COUNT(*) FROM user", [], |r| r.get(0))?;
            let role = role.unwrap_or(if existing == 0 {
                UserRole::Admin
            } else {
                UserRole::Viewer
            });

            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO user (id, email, role) VALUES (?1, ?2, ?3)",
                params![&id, &email, role.as_str()],
            )?;
            conn.execute(
                "INSERT INTO user_password_credentials (user_id, salt, hash, hasher)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &id,
                    &credentials.salt,
                    &credentials.hash,
                    credentials.hasher.to_string()
                ],
            )?;
            select_user(conn, "id", &id)
        })?;

        if let Some(user) = &user {
            info!("Created user {} with role {}", user.id, user.role);
        }
        Ok(user)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        select_user(&conn, "id", user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        select_user(&conn, "email", &normalize_email(email))
    }

    fn update_user(
        &self,
        user_id: &str,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<UserUpdateOutcome> {
        let email = email.map(normalize_email);
        self.write(|conn| {
            if select_user(conn, "id", user_id)?.is_none() {
                return Ok(UserUpdateOutcome::NotFound);
            }
            if let Some(email) = &email {
                let taken: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM user WHERE email = ?1 AND id != ?2)",
                    params![email, user_id],
                    |r| r.get(0),
                )?;
                if taken {
                    return Ok(UserUpdateOutcome::EmailTaken);
                }
                conn.execute(
                    "UPDATE user SET email = ?1 WHERE id = ?2",
                    params![email, user_id],
                )?;
            }
            if let Some(role) = role {
                conn.execute(
                    "UPDATE user SET role = ?1 WHERE id = ?2",
                    params![role.as_str(), user_id],
                )?;
            }
            Ok(UserUpdateOutcome::Updated)
        })
    }

    fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.write(|conn| {
            let deleted = conn.execute("DELETE FROM user WHERE id = ?1", params![user_id])?;
            Ok(deleted == 1)
        })
    }

    fn list_users(&self, role: Option<UserRole>, page: PageRequest) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let users = match role {
            Some(role) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{} WHERE role = ?1 ORDER BY created ASC, rowid ASC LIMIT ?2 OFFSET ?3",
                    USER_SELECT
                ))?;
                let rows = stmt.query_map(
                    params![role.as_str(), page.limit as i64, page.offset as i64],
                    parse_user_row,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{} ORDER BY created ASC, rowid ASC LIMIT ?1 OFFSET ?2",
                    USER_SELECT
                ))?;
                let rows = stmt.query_map(
                    params![page.limit as i64, page.offset as i64],
                    parse_user_row,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(users)
    }

    fn count_users(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM user", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            SqliteUserStore::new(temp_dir.path().join("user.db"), Duration::from_secs(5)).unwrap();
        (store, temp_dir)
    }

    fn credentials() -> PasswordCredentials {
        PasswordCredentials {
            salt: "salt".to_string(),
            hash: "hash".to_string(),
            hasher: PasswordHasher::Argon2,
        }
    }

    #[test]
    fn test_failed_commit_rolls_back_and_keeps_writer_usable() {
        let (store, _temp_dir) = create_tmp_store();

        let result = store.write(|conn| {
            conn.execute("PRAGMA defer_foreign_keys = ON", [])?;
            conn.execute(
                "INSERT INTO favorite (id, user_id, category, item_id, name)
                 VALUES ('fav', 'missing-user', 'track', 'item', 'Name')",
                [],
            )?;
            Ok(())
        });
        assert!(result.is_err());

        let user = store
            .create_user("after@example.com", &credentials(), None)
            .unwrap();
        assert!(user.is_some());
    }

    #[test]
    fn test_first_user_is_admin() {
        let (store, _temp_dir) = create_tmp_store();

        let first = store
            .create_user("first@example.com", &credentials(), None)
            .unwrap()
            .unwrap();
        let second = store
            .create_user("second@example.com", &credentials(), None)
            .unwrap()
            .unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Viewer);
    }

    #[test]
    fn test_explicit_role_wins() {
        let (store, _temp_dir) = create_tmp_store();
        let user = store
            .create_user("ed@example.com", &credentials(), Some(UserRole::Editor))
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Editor);
    }

    #[test]
    fn test_duplicate_email_is_rejected_case_insensitively() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("Ada@Example.com", &credentials(), None)
            .unwrap()
            .unwrap();

        let duplicate = store
            .create_user("  ada@example.COM", &credentials(), None)
            .unwrap();

        assert!(duplicate.is_none());
        assert_eq!(store.count_users().unwrap(), 1);
        assert!(store
            .get_user_by_email("ADA@example.com")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_concurrent_first_signups_yield_one_admin() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user.db");
        // Separate stores mean separate connections racing on the same file.
        let stores: Vec<_> = (0..4)
            .map(|_| SqliteUserStore::new(&path, Duration::from_secs(10)).unwrap())
            .collect();

        let handles: Vec<_> = stores
            .into_iter()
            .enumerate()
            .flat_map(|(i, store)| {
                (0..4).map(move |j| {
                    let store = store.clone();
                    thread::spawn(move || {
                        store
                            .create_user(&format!("user{}_{}@example.com", i, j), &credentials(), None)
                            .unwrap()
                            .unwrap()
                    })
                })
            })
            .collect();

        let users: Vec<User> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let admins = users.iter().filter(|u| u.role == UserRole::Admin).count();
        assert_eq!(users.len(), 16);
        assert_eq!(admins, 1);
    }

    #[test]
    fn test_credentials_roundtrip_and_update() {
        let (store, _temp_dir) = create_tmp_store();
        let user = store
            .create_user("a@example.com", &credentials(), None)
            .unwrap()
            .unwrap();

        let stored = store.get_password_credentials(&user.id).unwrap().unwrap();
        assert_eq!(stored.hash, "hash");
        assert_eq!(stored.hasher, PasswordHasher::Argon2);

        let updated = PasswordCredentials {
            hash: "new-hash".to_string(),
            ..credentials()
        };
        assert!(store.update_password_credentials(&user.id, &updated).unwrap());
        assert_eq!(
            store.get_password_credentials(&user.id).unwrap().unwrap().hash,
            "new-hash"
        );
        assert!(!store.update_password_credentials("nobody", &updated).unwrap());
    }

    #[test]
    fn test_update_user_outcomes() {
        let (store, _temp_dir) = create_tmp_store();
        let a = store
            .create_user("a@example.com", &credentials(), None)
            .unwrap()
            .unwrap();
        store
            .create_user("b@example.com", &credentials(), None)
            .unwrap()
            .unwrap();

        assert_eq!(
            store
                .update_user(&a.id, Some("B@example.com"), None)
                .unwrap(),
            UserUpdateOutcome::EmailTaken
        );
        assert_eq!(
            store.update_user("missing", None, None).unwrap(),
            UserUpdateOutcome::NotFound
        );
        assert_eq!(
            store
                .update_user(&a.id, Some("c@example.com"), Some(UserRole::Editor))
                .unwrap(),
            UserUpdateOutcome::Updated
        );

        let a = store.get_user(&a.id).unwrap().unwrap();
        assert_eq!(a.email, "c@example.com");
        assert_eq!(a.role, UserRole::Editor);
    }

    #[test]
    fn test_delete_user_removes_credentials_and_favorites() {
        let (store, _temp_dir) = create_tmp_store();
        let user = store
            .create_user("a@example.com", &credentials(), None)
            .unwrap()
            .unwrap();
        let favorite = store
            .add_favorite(&user.id, &FavoriteTarget::Artist("x".to_string()), "X")
            .unwrap()
            .unwrap();

        assert!(store.delete_user(&user.id).unwrap());
        assert!(!store.delete_user(&user.id).unwrap());
        assert!(store.get_password_credentials(&user.id).unwrap().is_none());
        assert!(store.get_favorite(&favorite.id).unwrap().is_none());
    }

    #[test]
    fn test_cannot_add_favorite_without_user() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.add_favorite("ghost", &FavoriteTarget::Track("t".to_string()), "T");
        assert!(result.is_err());
    }

    #[test]
    fn test_favorites_are_unique_and_newest_first() {
        let (store, _temp_dir) = create_tmp_store();
        let user = store
            .create_user("a@example.com", &credentials(), None)
            .unwrap()
            .unwrap();

        for id in ["t1", "t2", "t3"] {
            store
                .add_favorite(&user.id, &FavoriteTarget::Track(id.to_string()), id)
                .unwrap()
                .unwrap();
        }
        assert!(store
            .add_favorite(&user.id, &FavoriteTarget::Track("t2".to_string()), "t2")
            .unwrap()
            .is_none());
        // same item id in another category is a different favorite
        assert!(store
            .add_favorite(&user.id, &FavoriteTarget::Album("t2".to_string()), "t2")
            .unwrap()
            .is_some());

        let page = store
            .list_favorites(&user.id, FavoriteCategory::Track, PageRequest::new(Some(2), None))
            .unwrap();
        let names: Vec<_> = page.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["t3", "t2"]);

        let rest = store
            .list_favorites(
                &user.id,
                FavoriteCategory::Track,
                PageRequest::new(Some(2), Some(2)),
            )
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "t1");
    }

    #[test]
    fn test_list_users_by_role() {
        let (store, _temp_dir) = create_tmp_store();
        store
            .create_user("admin@example.com", &credentials(), None)
            .unwrap();
        store
            .create_user("v1@example.com", &credentials(), None)
            .unwrap();
        store
            .create_user("v2@example.com", &credentials(), None)
            .unwrap();

        let viewers = store
            .list_users(Some(UserRole::Viewer), PageRequest::default())
            .unwrap();
        assert_eq!(viewers.len(), 2);
        let all = store.list_users(None, PageRequest::default()).unwrap();
        assert_eq!(all[0].email, "admin@example.com");
    }

    #[test]
    fn test_schema_validates_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user.db");
        {
            let store = SqliteUserStore::new(&path, Duration::from_secs(1)).unwrap();
            store
                .create_user("a@example.com", &credentials(), None)
                .unwrap();
        }
        let store = SqliteUserStore::new(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(store.count_users().unwrap(), 1);

        let conn = store.conn.lock().unwrap();
        USER_VERSIONED_SCHEMAS[0].validate(&conn).unwrap();
    }
}
