//! User business logic - Registration, lookup and profile edits.
//!
//! The role is chosen once in [`register_user`]. [`ProfileUpdate`] carries no role
//! field, so nothing after registration can change it.

use crate::{
    entities::{User, UserRole, user},
    errors::{Error, Result},
};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use sea_orm::{ConnectionTrait, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// Donor or fundraiser
    pub role: UserRole,
    /// Optional phone number
    #[serde(default)]
    pub phone: String,
    /// Optional display name
    #[serde(default)]
    pub full_name: String,
    /// Required for fundraisers
    #[serde(default)]
    pub biography: String,
    /// Optional interests
    #[serde(default)]
    pub interests: String,
    /// Optional avatar URL
    #[serde(default)]
    pub avatar_url: String,
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New contact address
    pub email: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// New display name
    pub full_name: Option<String>,
    /// New biography
    pub biography: Option<String>,
    /// New interests
    pub interests: Option<String>,
    /// New avatar URL
    pub avatar_url: Option<String>,
}

fn regex_match(re: &Lazy<Option<Regex>>, value: &str, what: &str) -> Result<bool> {
    match &**re {
        Some(re) => re.is_match(value).map_err(|e| Error::Validation {
            message: format!("Could not validate {what}: {e}"),
        }),
        None => Err(Error::Validation {
            message: format!("{what} pattern failed to compile"),
        }),
    }
}

fn validate_username(username: &str) -> Result<()> {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,}$").ok());
    if regex_match(&RE, username, "username")? {
        Ok(())
    } else {
        Err(Error::validation(
            "Username must be at least 3 characters and contain only letters, numbers, or underscores.",
        ))
    }
}

fn validate_email(email: &str) -> Result<()> {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
    if regex_match(&RE, email, "email")? {
        Ok(())
    } else {
        Err(Error::validation("Enter a valid email address."))
    }
}

fn validate_password(password: &str) -> Result<()> {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| {
        Regex::new(r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d)(?=.*[^A-Za-z0-9]).{8,}$").ok()
    });
    if regex_match(&RE, password, "password")? {
        Ok(())
    } else {
        Err(Error::validation(
            "Password must be at least 8 characters long and include an uppercase letter, \
             a lowercase letter, a digit and a special character.",
        ))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

async fn ensure_email_free<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    except_user: Option<i64>,
) -> Result<()> {
    let mut query = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except_user {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(Error::Conflict {
            message: "A user with that email already exists.".to_string(),
        });
    }
    Ok(())
}

/// Registers a new account.
///
/// # Arguments
/// * `db` - Database connection
/// * `input` - Registration form
///
/// # Errors
/// Validation errors for malformed username, email or password, or a fundraiser
/// without a biography; `Conflict` when the username or email is taken.
pub async fn register_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    let username = input.username.trim().to_string();
    let email = input.email.trim().to_string();
    let biography = input.biography.trim().to_string();

    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&input.password)?;
    if input.role == UserRole::Fundraiser && biography.is_empty() {
        return Err(Error::validation("Fundraisers must provide a biography."));
    }

    if get_user_by_username(db, &username).await?.is_some() {
        return Err(Error::Conflict {
            message: "A user with that username already exists.".to_string(),
        });
    }
    ensure_email_free(db, &email, None).await?;

    let password_hash = hash_password(&input.password)?;

    let new_user = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(input.role),
        phone: Set(input.phone.trim().to_string()),
        full_name: Set(input.full_name.trim().to_string()),
        biography: Set(biography),
        interests: Set(input.interests.trim().to_string()),
        avatar_url: Set(input.avatar_url.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = new_user.insert(db).await?;
    info!(
        "Registered user {} ({}) as {:?}",
        created.username, created.id, created.role
    );
    Ok(created)
}

/// Finds a user by primary key.
pub async fn get_user_by_id<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(conn).await.map_err(Into::into)
}

/// Finds a user by exact username.
pub async fn get_user_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Loads a user, failing with `NotFound` when missing.
pub async fn require_user<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<user::Model> {
    get_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Applies a profile edit. The role column is never written.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i64,
    changes: ProfileUpdate,
) -> Result<user::Model> {
    let existing = require_user(db, user_id).await?;
    let is_fundraiser = existing.can_fundraise();
    let mut active: user::ActiveModel = existing.into();

    if let Some(email) = changes.email {
        let email = email.trim().to_string();
        validate_email(&email)?;
        ensure_email_free(db, &email, Some(user_id)).await?;
        active.email = Set(email);
    }
    if let Some(biography) = changes.biography {
        let biography = biography.trim().to_string();
        if is_fundraiser && biography.is_empty() {
            return Err(Error::validation("Fundraisers must provide a biography."));
        }
        active.biography = Set(biography);
    }
    if let Some(phone) = changes.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(full_name) = changes.full_name {
        active.full_name = Set(full_name.trim().to_string());
    }
    if let Some(interests) = changes.interests {
        active.interests = Set(interests.trim().to_string());
    }
    if let Some(avatar_url) = changes.avatar_url {
        active.avatar_url = Set(avatar_url.trim().to_string());
    }

    let updated = active.update(db).await?;
    info!("Updated profile of user {}", updated.id);
    Ok(updated)
}

/// Checks a plain-text password against the stored hash.
///
/// Returns `Ok(false)` on mismatch; an unparsable stored hash is an error.
pub fn verify_password(account: &user::Model, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(&account.password_hash).map_err(|e| Error::PasswordHash {
        message: e.to_string(),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Whether the account may create campaigns.
#[must_use]
pub fn can_fundraise(account: &user::Model) -> bool {
    account.can_fundraise()
}
