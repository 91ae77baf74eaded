//! API Key generation
//!
//! Generates `bzk_<env>_<random>` secrets and the SHA-256 digests stored in
//! their place.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

use crate::domain::api_key::KeyEnvironment;

/// Brand prefix shared by every key
pub const KEY_PREFIX: &str = "bzk";

/// Length of the random portion of a key
pub const RANDOM_PART_LENGTH: usize = 40;

/// Number of random characters exposed in the public key ID
pub const KEY_ID_RANDOM_CHARS: usize = 12;

/// Result of generating a new API key
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// The full API key (only shown once)
    pub key: String,
    /// Public prefix used for lookup and display
    pub key_id: String,
    /// Digest persisted instead of the key
    pub hash: String,
}

/// Generator for secure API keys
#[derive(Debug, Clone, Default)]
pub struct ApiKeyGenerator;

impl ApiKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a new API key for an environment
    pub fn generate(&self, environment: KeyEnvironment) -> GeneratedApiKey {
        let random: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(RANDOM_PART_LENGTH)
            .map(char::from)
            .collect();

        self.from_random_part(environment, &random)
    }

    /// Build a key from a known random part (deterministic keys for tests)
    pub fn from_random_part(&self, environment: KeyEnvironment, random: &str) -> GeneratedApiKey {
        let key = format!("{}_{}_{}", KEY_PREFIX, environment.as_str(), random);
        let key_id = derive_key_id(environment, random);
        let hash = hash_key(&key);

        GeneratedApiKey { key, key_id, hash }
    }
}


fn derive_key_id(environment: KeyEnvironment, random: &str) -> String {
    let visible: String = random.chars().take(KEY_ID_RANDOM_CHARS).collect();
    format!("{}_{}_{}", KEY_PREFIX, environment.as_str(), visible)
}

/// Hash an API key for storage
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    format!("sha256${}", URL_SAFE_NO_PAD.encode(result))
}

/// Verify an API key against a stored hash
pub fn verify_key(key: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_key(key), stored_hash)
}

/// Parse a presented key and derive its public key ID
///
/// Returns `None` for anything not shaped like `bzk_<env>_<alphanumeric>`.
pub fn extract_key_id(key: &str) -> Option<String> {
    let mut parts = key.splitn(3, '_');

    if parts.next()? != KEY_PREFIX {
        return None;
    }

    let environment: KeyEnvironment = parts.next()?.parse().ok()?;
    let random = parts.next()?;

    if random.len() < KEY_ID_RANDOM_CHARS || !random.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(derive_key_id(environment, random))
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_live_key() {
        let generated = ApiKeyGenerator::new().generate(KeyEnvironment::Live);

        assert!(generated.key.starts_with("bzk_live_"));
        assert_eq!(generated.key.len(), "bzk_live_".len() + RANDOM_PART_LENGTH);
        assert_eq!(generated.key_id.len(), "bzk_live_".len() + KEY_ID_RANDOM_CHARS);
        assert!(generated.key.starts_with(&generated.key_id));
        assert!(generated.hash.starts_with("sha256$"));
    }

    #[test]
    fn test_random_part_is_alphanumeric() {
        let generated = ApiKeyGenerator::new().generate(KeyEnvironment::Test);
        let random = generated.key.trim_start_matches("bzk_test_");

        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_key_uniqueness() {
        let generator = ApiKeyGenerator::new();
        let keys: HashSet<String> = (0..200)
            .map(|_| generator.generate(KeyEnvironment::Live).key)
            .collect();

        assert_eq!(keys.len(), 200);
    }

    #[test]
    fn test_key_id_is_deterministic() {
        let generator = ApiKeyGenerator::new();
        let generated = generator.generate(KeyEnvironment::Live);

        assert_eq!(extract_key_id(&generated.key), Some(generated.key_id.clone()));
        assert_eq!(extract_key_id(&generated.key), extract_key_id(&generated.key));
    }

    #[test]
    fn test_from_random_part() {
        let generated =
            ApiKeyGenerator::new().from_random_part(KeyEnvironment::Test, "abcdefghijklmnop1234");

        assert_eq!(generated.key, "bzk_test_abcdefghijklmnop1234");
        assert_eq!(generated.key_id, "bzk_test_abcdefghijkl");
    }

    #[test]
    fn test_verify_key() {
        let generated = ApiKeyGenerator::new().generate(KeyEnvironment::Live);

        assert!(verify_key(&generated.key, &generated.hash));
        assert!(!verify_key("bzk_live_wrong", &generated.hash));
    }

    #[test]
    fn test_extract_key_id_rejects_malformed() {
        assert_eq!(extract_key_id("pk_live_abcdefghijklmnop"), None);
        assert_eq!(extract_key_id("bzk_staging_abcdefghijklmnop"), None);
        assert_eq!(extract_key_id("bzk_live_short"), None);
        assert_eq!(extract_key_id("bzk_live_abcdefghijkl-mnop"), None);
        assert_eq!(extract_key_id("bzk_live"), None);
        assert_eq!(extract_key_id(""), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
