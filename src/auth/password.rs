use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{error, warn};

/// Prefix marking a hash that no password can ever match.
const UNUSABLE_PREFIX: char = '!';

pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    static ref DUMMY_HASH: Option<String> = hash_password("no-such-account").ok();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Hash stored for accounts created without a password.
pub fn unusable_password() -> String {
    let tail: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect();
    format!("{UNUSABLE_PREFIX}{tail}")
}

pub fn is_usable(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PREFIX)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    if !is_usable(hash) {
        return Ok(false);
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs a full verification against a throwaway hash so that a lookup miss
/// costs about as much as a wrong password.
pub fn verify_dummy(plain: &str) {
    let Some(hash) = DUMMY_HASH.as_deref() else {
        return;
    };
    if let Err(e) = verify_password(plain, hash) {
        warn!(error = %e, "dummy verification failed");
    }
}

/// Problems with a candidate password, empty when it is acceptable.
pub fn password_problems(plain: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if plain.is_empty() {
        problems.push("This field may not be blank.".to_string());
    } else if plain.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_hash_is_a_real_hash() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash");
        assert!(is_usable(hash));
        assert!(!verify_password("anything", hash).unwrap());
        verify_dummy("anything");
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn unusable_hash_never_matches() {
        let hash = unusable_password();
        assert!(!is_usable(&hash));
        assert_eq!(hash.len(), 41);
        assert!(!verify_password("", &hash).unwrap());
        assert!(!verify_password(&hash, &hash).unwrap());
    }

    #[test]
    fn short_and_blank_passwords_are_reported() {
        assert_eq!(password_problems("").len(), 1);
        assert_eq!(password_problems("test1").len(), 1);
        assert!(password_problems("testpass").is_empty());
        // counted in characters, not bytes
        assert_eq!(password_problems("ééééééé").len(), 1);
    }
}
