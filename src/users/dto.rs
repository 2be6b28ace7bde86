use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    auth::password::password_problems,
    error::FieldErrors,
    users::{manager::normalize_email, repo_types::User},
};

pub const MAX_NAME_LENGTH: usize = 255;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn check_email(errors: &mut FieldErrors, email: Option<&str>) {
    match email.map(str::trim) {
        None => errors.add("email", REQUIRED),
        Some("") => errors.add("email", BLANK),
        Some(e) if !is_valid_email(e) => errors.add("email", "Enter a valid email address."),
        Some(_) => {}
    }
}

fn check_password(errors: &mut FieldErrors, password: Option<&str>) {
    match password {
        None => errors.add("password", REQUIRED),
        Some(p) => {
            for problem in password_problems(p) {
                errors.add("password", problem);
            }
        }
    }
}

fn check_name(errors: &mut FieldErrors, name: Option<&str>) {
    if let Some(name) = name {
        if name.chars().count() > MAX_NAME_LENGTH {
            errors.add(
                "name",
                format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
            );
        }
    }
}

/// Request body for account creation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, self.email.as_deref());
        check_password(&mut errors, self.password.as_deref());
        check_name(&mut errors, self.name.as_deref());
        errors
    }
}

/// Request body for token issuance.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl TokenRequest {
    /// Presence only; credentials are checked against the store afterwards.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [("email", &self.email), ("password", &self.password)] {
            match value.as_deref() {
                None => errors.add(field, REQUIRED),
                Some(v) if v.trim().is_empty() => errors.add(field, BLANK),
                Some(_) => {}
            }
        }
        errors
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request body for `PATCH /me` (all optional) and `PUT /me` (email and password
/// required).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self, partial: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !partial || self.email.is_some() {
            check_email(&mut errors, self.email.as_deref());
        }
        if !partial || self.password.is_some() {
            check_password(&mut errors, self.password.as_deref());
        }
        check_name(&mut errors, self.name.as_deref());
        errors
    }

    pub fn normalized_email(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("test@gmail.com"));
        assert!(!is_valid_email("test_token"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn create_request_collects_every_problem() {
        let req = CreateUserRequest {
            email: None,
            password: Some("test1".into()),
            name: Some("x".repeat(MAX_NAME_LENGTH + 1)),
        };
        let errors = req.validate();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn token_request_requires_non_blank_fields() {
        let req = TokenRequest {
            email: Some("test_token".into()),
            password: Some(String::new()),
        };
        let errors = req.validate();
        assert!(errors.get("email").is_none());
        assert_eq!(errors.get("password").unwrap().to_vec(), vec![BLANK.to_string()]);
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        let req = UpdateProfileRequest {
            name: Some("new name".into()),
            ..Default::default()
        };
        assert!(req.validate(true).is_empty());
        let full = req.validate(false);
        assert!(full.get("email").is_some());
        assert!(full.get("password").is_some());
    }

    #[test]
    fn profile_response_has_no_password() {
        let json = serde_json::to_value(ProfileResponse {
            email: "test@gmail.com".into(),
            name: "Test".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "email": "test@gmail.com", "name": "Test" }));
    }
}
