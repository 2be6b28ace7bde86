use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::password,
    users::{
        repo::{StoreError, UserStore},
        repo_types::{NewUser, User, UserChanges},
    },
};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("users must have an email address")]
    MissingEmail,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hash(anyhow::Error),
}

/// Trims surrounding whitespace and lower-cases the domain part.
///
/// The local part is left alone: mailbox names may be case-sensitive.
/// Returns `None` for blank input.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() {
        return None;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => Some(format!("{local}@{}", domain.to_lowercase())),
        None => Some(email.to_string()),
    }
}

/// Optional attributes for `create_user`.
#[derive(Debug, Clone)]
pub struct ExtraFields {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for ExtraFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

impl ExtraFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Changes requested through the profile API or the admin site.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Creation, lookup and authentication of users on top of a `UserStore`.
#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(
        &self,
        email: Option<&str>,
        password: Option<&str>,
        extra: ExtraFields,
    ) -> Result<User, ManagerError> {
        let email = email
            .and_then(normalize_email)
            .ok_or(ManagerError::MissingEmail)?;
        let password_hash = match password {
            Some(plain) => password::hash_password(plain).map_err(ManagerError::Hash)?,
            None => password::unusable_password(),
        };

        let user = self
            .store
            .insert(NewUser {
                email,
                name: extra.name,
                password_hash,
                is_active: extra.is_active,
                is_staff: extra.is_staff,
                is_superuser: extra.is_superuser,
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User, ManagerError> {
        let extra = ExtraFields {
            is_staff: true,
            is_superuser: true,
            ..ExtraFields::default()
        };
        self.create_user(Some(email), Some(password), extra).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.store.find_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match normalize_email(email) {
            Some(email) => self.store.find_by_email(&email).await,
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.store.list().await
    }

    /// The active user owning `email` whose password is `password`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, StoreError> {
        let Some(user) = self.get_by_email(email).await? else {
            password::verify_dummy(password);
            debug!("authenticate: unknown email");
            return Ok(None);
        };
        if !user.check_password(password) {
            debug!(user_id = %user.id, "authenticate: wrong password");
            return Ok(None);
        }
        if !user.is_active {
            debug!(user_id = %user.id, "authenticate: inactive user");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn update(&self, id: Uuid, update: ProfileUpdate) -> Result<Option<User>, ManagerError> {
        let email = match update.email {
            Some(raw) => Some(normalize_email(&raw).ok_or(ManagerError::MissingEmail)?),
            None => None,
        };
        let password_hash = match update.password {
            Some(plain) => Some(password::hash_password(&plain).map_err(ManagerError::Hash)?),
            None => None,
        };
        let changes = UserChanges {
            email,
            name: update.name,
            password_hash,
            is_active: update.is_active,
            is_staff: update.is_staff,
            is_superuser: update.is_superuser,
            last_login: None,
        };
        let user = self.store.update(id, changes).await?;
        if let Some(u) = &user {
            info!(user_id = %u.id, "user updated");
        }
        Ok(user)
    }

    pub async fn record_login(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let changes = UserChanges {
            last_login: Some(OffsetDateTime::now_utc()),
            ..UserChanges::default()
        };
        self.store.update(id, changes).await
    }
}
