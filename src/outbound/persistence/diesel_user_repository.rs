//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Rows are decoded through the validated domain constructors, so corrupt
//! stored identities surface as query errors instead of leaking outward.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{
    NewUser, UserChanges, UserConstraint, UserPersistenceError, UserRepository,
};
use crate::domain::{AuthProvider, Email, User, UserId, Username};

use super::error_mapping::{map_basic_diesel_error, map_basic_pool_error, unique_violation};
use super::models::{NewUserRow, UserChangesRow, UserRow};
use super::pool::{DbPool, PoolError, checkout};
use super::schema::users;

/// Diesel-backed implementation of the identity store port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    map_basic_pool_error(error, |message| UserPersistenceError::Connection { message })
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    if let Some(constraint) = unique_violation(&error) {
        // Unique indexes: users_email_key, users_username_key,
        // users_google_id_key, users_reset_token_key.
        let constraint = if constraint.contains("email") {
            UserConstraint::Email
        } else if constraint.contains("username") {
            UserConstraint::Username
        } else {
            UserConstraint::GoogleId
        };
        return UserPersistenceError::Conflict { constraint };
    }
    map_basic_diesel_error(
        error,
        |message| UserPersistenceError::query(message),
        |message| UserPersistenceError::connection(message),
    )
}

/// Convert a database row into a validated domain user.
fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let email = Email::parse(&row.email)
        .map_err(|err| UserPersistenceError::query(format!("stored email invalid: {err}")))?;
    let username = Username::parse(&row.username)
        .map_err(|err| UserPersistenceError::query(format!("stored username invalid: {err}")))?;
    let auth_provider = AuthProvider::from_str_storage(&row.auth_provider).ok_or_else(|| {
        UserPersistenceError::query(format!("stored auth provider invalid: {}", row.auth_provider))
    })?;
    Ok(User {
        id: UserId::from(row.id),
        email,
        username,
        password_hash: row.password_hash,
        google_id: row.google_id,
        auth_provider,
        reset_token: row.reset_token,
        reset_token_expiry: row.reset_token_expiry,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_optional_user(row: Option<UserRow>) -> Result<Option<User>, UserPersistenceError> {
    row.map(row_to_user).transpose()
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = users::table
            .find(*id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row_to_optional_user(row)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row_to_optional_user(row)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row_to_optional_user(row)
    }

    async fn find_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::google_id.eq(google_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row_to_optional_user(row)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = diesel::insert_into(users::table)
            .values(NewUserRow {
                id: Uuid::new_v4(),
                email: new_user.email.as_str(),
                username: new_user.username.as_str(),
                password_hash: new_user.password_hash.as_deref(),
                google_id: new_user.google_id.as_deref(),
                auth_provider: new_user.auth_provider.as_str(),
            })
            .returning(UserRow::as_select())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_user(row)
    }

    async fn update(
        &self,
        id: &UserId,
        changes: UserChanges,
    ) -> Result<User, UserPersistenceError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = diesel::update(users::table.find(*id.as_uuid()))
            .set(UserChangesRow {
                google_id: changes.google_id,
                auth_provider: changes
                    .auth_provider
                    .map(|provider| provider.as_str().to_owned()),
                reset_token: changes.reset_token,
                reset_token_expiry: changes.reset_token_expiry,
                updated_at: Utc::now(),
            })
            .returning(UserRow::as_select())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_user(row)
    }
}
