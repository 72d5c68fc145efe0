//! SQLite-backed user and credential storage

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CredentialStore, UserStore};
use crate::models::{Credential, UserId, UserProfile};

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: signed-in users
        M::up(
            r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                given_name TEXT NOT NULL DEFAULT '',
                family_name TEXT NOT NULL DEFAULT '',
                picture TEXT NOT NULL DEFAULT '',
                locale TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );
            "#,
        ),
        // Migration 2: one OAuth credential per user
        M::up(
            r#"
            CREATE TABLE credentials (
                user_id TEXT PRIMARY KEY NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL DEFAULT '',
                token_type TEXT NOT NULL DEFAULT 'Bearer',
                expiry TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        ),
    ])
}

/// SQLite implementation of the user and credential stores
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        // WAL lets readers proceed while the auth flow writes a credential
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp in database: {}", value))?;
    Ok(parsed.with_timezone(&Utc))
}

impl CredentialStore for SqliteStore {
    fn get_credential_by_user(&self, user_id: &UserId) -> Result<Option<Credential>> {
        let conn = self.conn();

        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT access_token, refresh_token, token_type, expiry
                 FROM credentials WHERE user_id = ?",
                [user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .with_context(|| format!("Failed to load credential for user {}", user_id))?;

        let Some((access_token, refresh_token, token_type, expiry)) = row else {
            return Ok(None);
        };

        Ok(Some(Credential {
            user_id: user_id.clone(),
            access_token,
            refresh_token,
            token_type,
            expiry: parse_timestamp(&expiry)?,
        }))
    }

    fn save_credential(&self, credential: &Credential) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO credentials (user_id, access_token, refresh_token, token_type, expiry, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                credential.user_id.as_str(),
                credential.access_token,
                credential.refresh_token,
                credential.token_type,
                credential.expiry.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to save credential for user {}", credential.user_id))?;
        Ok(())
    }

    fn update_credential(&self, credential: &Credential) -> Result<()> {
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE credentials
                 SET access_token = ?, refresh_token = ?, token_type = ?, expiry = ?, updated_at = ?
                 WHERE user_id = ?",
                params![
                    credential.access_token,
                    credential.refresh_token,
                    credential.token_type,
                    credential.expiry.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    credential.user_id.as_str(),
                ],
            )
            .with_context(|| {
                format!("Failed to update credential for user {}", credential.user_id)
            })?;

        if updated == 0 {
            bail!("no credential stored for user {}", credential.user_id);
        }
        Ok(())
    }
}

impl UserStore for SqliteStore {
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                "SELECT name, given_name, family_name, picture, locale FROM users WHERE id = ?",
                [user_id.as_str()],
                |row| {
                    Ok(UserProfile {
                        id: user_id.clone(),
                        name: row.get(0)?,
                        given_name: row.get(1)?,
                        family_name: row.get(2)?,
                        picture: row.get(3)?,
                        locale: row.get(4)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("Failed to load user {}", user_id))?;
        Ok(user)
    }

    fn create_user(&self, user: &UserProfile) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, name, given_name, family_name, picture, locale, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                user.id.as_str(),
                user.name,
                user.given_name,
                user.family_name,
                user.picture,
                user.locale,
                Utc::now().to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to create user {}", user.id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};

    fn credential(user: &str, token: &str) -> Credential {
        Credential {
            user_id: UserId::new(user),
            access_token: token.to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expiry: (Utc::now() + Duration::hours(1)).trunc_subsecs(0),
        }
    }

    fn store_with_user(user: &str) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_user(&UserProfile::new(user)).unwrap();
        store
    }

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_credential_round_trip_preserves_expiry() {
        let store = store_with_user("u1");
        let cred = credential("u1", "a1");
        store.save_credential(&cred).unwrap();

        let loaded = store.get_credential_by_user(&UserId::new("u1")).unwrap();
        assert_eq!(loaded, Some(cred));
    }

    #[test]
    fn test_missing_credential_is_none() {
        let store = store_with_user("u1");
        assert!(store.get_credential_by_user(&UserId::new("u1")).unwrap().is_none());
    }

    #[test]
    fn test_update_credential() {
        let store = store_with_user("u1");
        store.save_credential(&credential("u1", "a1")).unwrap();
        store.update_credential(&credential("u1", "a2")).unwrap();

        let loaded = store.get_credential_by_user(&UserId::new("u1")).unwrap().unwrap();
        assert_eq!(loaded.access_token, "a2");
    }

    #[test]
    fn test_update_missing_credential_fails() {
        let store = store_with_user("u1");
        assert!(store.update_credential(&credential("u1", "a1")).is_err());
    }

    #[test]
    fn test_credential_requires_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.save_credential(&credential("ghost", "a1")).is_err());
    }

    #[test]
    fn test_user_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut user = UserProfile::new("u1");
        user.name = "Ada Lovelace".to_string();
        user.locale = "en".to_string();
        store.create_user(&user).unwrap();

        assert_eq!(store.get_user(&UserId::new("u1")).unwrap(), Some(user));
        assert!(store.get_user(&UserId::new("u2")).unwrap().is_none());
    }
}
