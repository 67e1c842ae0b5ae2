use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize, Serializer};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Plain-text password, kept out of logs
#[derive(Debug, Clone)]
pub struct Password(Secret<String>);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Secret::new(password.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_long_enough(&self) -> bool {
        self.as_str().chars().count() >= MIN_PASSWORD_LENGTH
    }
}

/// Argon2 PHC string as stored on the user record.
///
/// Persists as a plain string; `Debug` stays redacted.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PasswordHashString(Secret<String>);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(Secret::new(hash))
    }

    pub fn as_str(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<&str> for PasswordHashString {
    fn from(hash: &str) -> Self {
        Self::new(hash.to_string())
    }
}

impl PartialEq for PasswordHashString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for PasswordHashString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Hash with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let password = Password::new("secret123");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).is_ok());
        assert!(verify_password(&Password::new("wrong-one"), &hash).is_err());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let password = Password::new("secret123");
        let a = hash_password(&password).unwrap();
        let b = hash_password(&password).unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn debug_output_is_redacted() {
        let password = Password::new("hunter22");
        assert!(!format!("{:?}", password).contains("hunter22"));

        let hash = hash_password(&password).unwrap();
        assert!(!format!("{:?}", hash).contains("$argon2"));
    }

    #[test]
    fn hash_persists_as_plain_string() {
        let hash = PasswordHashString::from("$argon2id$v=19$abc");
        let json = serde_json::to_value(&hash).unwrap();
        assert_eq!(json, serde_json::json!("$argon2id$v=19$abc"));

        let back: PasswordHashString = serde_json::from_value(json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn enforces_minimum_length() {
        assert!(!Password::new("12345").is_long_enough());
        assert!(Password::new("123456").is_long_enough());
    }
}
