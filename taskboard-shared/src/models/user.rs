/// User model and database operations
///
/// Users own credentials (password and recovery answer, both stored as
/// Argon2id hashes) and the login throttle state used by the lockout guard.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     recovery_answer_hash TEXT NOT NULL,
///     failed_attempts INTEGER NOT NULL DEFAULT 0 CHECK (failed_attempts >= 0),
///     last_failed_attempt TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "ana@example.com".to_string(),
///     username: "ana".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ana".to_string(),
///     last_name: "Lopez".to_string(),
///     recovery_answer_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_username(&pool, "ana").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     recovery_answer_hash, failed_attempts, last_failed_attempt, created_at";

/// User account row
///
/// Never serialize this type to clients; use [`PublicUser`] instead.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (unique)
    pub email: String,

    /// Login name (unique, `[A-Za-z0-9_]{3,}`)
    pub username: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id hash of the security question answer
    pub recovery_answer_hash: String,

    /// Consecutive failed login attempts
    pub failed_attempts: i32,

    /// Set whenever `failed_attempts` is incremented
    pub last_failed_attempt: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Fields of a user that are safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Input for creating a new user
///
/// Both secrets must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub recovery_answer_hash: String,
}

impl User {
    /// Inserts a new user with a zero failure count
    ///
    /// # Errors
    ///
    /// Returns a database error on unique constraint violation (email or
    /// username) or connection failure.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO users (email, username, password_hash, first_name, last_name, recovery_answer_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.username)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.recovery_answer_hash)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by email address
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by username
    pub async fn find_by_username<'e, E>(
        executor: E,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(executor)
            .await
    }

    /// Persists the login throttle counters
    ///
    /// # Returns
    ///
    /// True if the user exists and was updated
    pub async fn update_login_state<'e, E>(
        executor: E,
        id: Uuid,
        failed_attempts: i32,
        last_failed_attempt: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET failed_attempts = $2,
                last_failed_attempt = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(failed_attempts)
        .bind(last_failed_attempt)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the stored password hash
    ///
    /// # Returns
    ///
    /// The updated user, or None if it no longer exists
    pub async fn update_password<'e, E>(
        executor: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE users SET password_hash = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(password_hash)
            .fetch_optional(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            username: "ana".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Lopez".to_string(),
            recovery_answer_hash: "$argon2id$answer".to_string(),
            failed_attempts: 0,
            last_failed_attempt: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_user_omits_secrets() {
        let user = sample_user();
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();

        assert_eq!(json["username"], "ana");
        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["lastName"], "Lopez");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("recoveryAnswerHash").is_none());
    }
}
