use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string or unusable marker
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// True when `plain` matches the stored hash. Malformed hashes never match.
    pub fn check_password(&self, plain: &str) -> bool {
        password::verify_password(plain, &self.password_hash).unwrap_or(false)
    }

    pub fn has_usable_password(&self) -> bool {
        password::is_usable(&self.password_hash)
    }

    /// Staff flag alone is not enough; deactivated staff lose admin access.
    pub fn can_use_admin(&self) -> bool {
        self.is_active && self.is_staff
    }
}

/// Row to insert. Email must already be normalized and the password hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Column changes; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub last_login: Option<OffsetDateTime>,
}
