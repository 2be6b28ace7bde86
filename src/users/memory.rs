use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User, UserChanges},
};

/// Process-local store used when no database is configured, and by tests.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }

        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(all)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().map_err(|_| StoreError::Poisoned)?;

        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::EmailTaken);
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(v) = changes.is_active {
            user.is_active = v;
        }
        if let Some(v) = changes.is_staff {
            user.is_staff = v;
        }
        if let Some(v) = changes.is_superuser {
            user.is_superuser = v;
        }
        if let Some(at) = changes.last_login {
            user.last_login = Some(at);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: String::new(),
            password_hash: "!unusable".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();
        let err = store.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@example.com")).await.unwrap();
        let changes = UserChanges {
            name: Some("Alice".into()),
            is_staff: Some(true),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.name, "Alice");
        assert!(updated.is_staff);
        assert_eq!(updated.email, "a@example.com");
        assert_eq!(updated.password_hash, "!unusable");
    }

    #[tokio::test]
    async fn update_cannot_steal_another_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();
        let b = store.insert(new_user("b@example.com")).await.unwrap();
        let changes = UserChanges {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        let err = store.update(b.id, changes).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_none() {
        let store = MemoryUserStore::new();
        let res = store
            .update(Uuid::new_v4(), UserChanges::default())
            .await
            .unwrap();
        assert!(res.is_none());
    }
}
