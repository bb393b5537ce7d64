//! bcrypt password hashing
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use crate::error::Result;
use tracing::debug;

/// Cost used when none is configured
pub const DEFAULT_COST: u32 = 10;

/// Hashes and verifies account passwords
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;

        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        debug!("Hashed password with cost {}", cost);
        Ok(hash)
    }

    /// Returns `Ok(false)` on mismatch; errors only for unreadable hashes
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(matches)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        assert_eq!(hasher.cost(), 4);
        let hash = hasher.hash("hunter22").await.unwrap();

        assert_ne!(hash, "hunter22");
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify("hunter22", &hash).await.unwrap());
        assert!(!hasher.verify("hunter23", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_salted_hashes_differ() {
        let hasher = PasswordHasher::new(4);
        let a = hasher.hash("same-password").await.unwrap();
        let b = hasher.hash("same-password").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        assert!(hasher.verify("whatever", "not-a-bcrypt-hash").await.is_err());
    }
}
