//! PKCE (Proof Key for Code Exchange) support for OAuth 2.0.
//!
//! Implements the S256 method of RFC 7636 for securing authorization code flows
//! in public clients.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// PKCE code verifier (random string).
#[derive(Debug, Clone)]
pub struct PkceVerifier(SecretString);

impl PkceVerifier {
    /// Generate a new random PKCE verifier.
    ///
    /// Two random v4 UUIDs in simple form give 64 lowercase hex characters,
    /// inside the 43-128 character range RFC 7636 requires.
    pub fn generate() -> Self {
        let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self(SecretString::from(verifier))
    }

    /// Create a PKCE verifier from an existing string.
    pub fn from_string(verifier: String) -> Self {
        Self(SecretString::from(verifier))
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        self.0.expose_secret()
    }

    /// Generate the corresponding code challenge.
    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge::from_verifier(self)
    }
}

/// PKCE code challenge (SHA256 hash of verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Challenge method sent alongside the challenge.
    pub const METHOD: &'static str = "S256";

    /// Create a code challenge from a verifier.
    ///
    /// Uses SHA256 hashing and unpadded base64url encoding as per RFC 7636.
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_str().as_bytes());
        let hash = hasher.finalize();
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    /// Get the challenge string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 64);
        assert!(verifier.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pkce_verifiers_are_unique() {
        assert_ne!(
            PkceVerifier::generate().as_str(),
            PkceVerifier::generate().as_str()
        );
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_example() {
        // RFC 7636 Appendix B
        let verifier =
            PkceVerifier::from_string("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(
            verifier.challenge().as_str(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pkce_challenge_is_url_safe_without_padding() {
        for _ in 0..32 {
            let challenge = PkceVerifier::generate().challenge();
            let value = challenge.as_str();
            assert_eq!(value.len(), 43);
            assert!(!value.contains('+'));
            assert!(!value.contains('/'));
            assert!(!value.contains('='));
        }
    }

    #[test]
    fn test_pkce_challenge_deterministic() {
        let verifier = PkceVerifier::from_string("test_verifier".to_string());
        assert_eq!(verifier.challenge(), verifier.challenge());
    }
}
