use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for a plaintext password to prevent accidental logging
#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Newtype for a stored password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password using Argon2id with a generated salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash.
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
    fn test_hash_and_verify_round_trip() {
        let password = Password::new("front-desk-pass-1".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_fails_verification() {
        let password = Password::new("front-desk-pass-1".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        let wrong = Password::new("front-desk-pass-2".to_string());
        assert!(verify_password(&wrong, &hash).is_err());
    }

    #[test]
    fn test_salting_produces_distinct_hashes() {
        let password = Password::new("front-desk-pass-1".to_string());
        let hash1 = hash_password(&password).unwrap();
        let hash2 = hash_password(&password).unwrap();

        assert_ne!(hash1.as_str(), hash2.as_str());
        assert!(verify_password(&password, &hash2).is_ok());
    }
}
