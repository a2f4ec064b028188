//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `DatabaseService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gendoc_core::domain::{HistoryRecord, NewHistoryRecord, User, UserCredentials};
use gendoc_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    user_id: Uuid,
    file_name: String,
    format: String,
    parse_summary: serde_json::Value,
    project_info: String,
    uml_instructions: String,
    generated_files: serde_json::Value,
    created_at: DateTime<Utc>,
}
impl HistoryRow {
    /// JSONB columns hold exactly the serde shapes of the domain types, so a
    /// decode failure here means the row was written by something else.
    fn to_domain(self) -> PortResult<HistoryRecord> {
        let format = self
            .format
            .parse()
            .map_err(|e: gendoc_core::domain::UnknownFormat| PortError::Unexpected(e.to_string()))?;
        let parse_summary = serde_json::from_value(self.parse_summary)
            .map_err(|e| PortError::Unexpected(format!("bad parse_summary column: {e}")))?;
        let generated_files = serde_json::from_value(self.generated_files)
            .map_err(|e| PortError::Unexpected(format!("bad generated_files column: {e}")))?;
        Ok(HistoryRecord {
            id: self.id,
            user_id: self.user_id,
            file_name: self.file_name,
            format,
            parse_summary,
            project_info: self.project_info,
            uml_instructions: self.uml_instructions,
            generated_files,
            created_at: self.created_at,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING user_id, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} already registered", email))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_history(&self, record: NewHistoryRecord) -> PortResult<Uuid> {
        let parse_summary = serde_json::to_value(&record.parse_summary)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let generated_files = serde_json::to_value(&record.generated_files)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO history \
             (id, user_id, file_name, format, parse_summary, project_info, uml_instructions, generated_files) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(record.user_id)
        .bind(&record.file_name)
        .bind(record.format.to_string())
        .bind(parse_summary)
        .bind(&record.project_info)
        .bind(&record.uml_instructions)
        .bind(generated_files)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(id)
    }

    async fn list_history(&self, user_id: Uuid) -> PortResult<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, user_id, file_name, format, parse_summary, project_info, \
                    uml_instructions, generated_files, created_at \
             FROM history WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        rows.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete_history(&self, id: Uuid, user_id: Uuid) -> PortResult<bool> {
        // The owner check lives in the WHERE clause so someone else's id and
        // a nonexistent id are the same "not found" from outside.
        let result = sqlx::query("DELETE FROM history WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}
