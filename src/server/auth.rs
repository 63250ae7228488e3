//! Single shared dashboard password.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::core::errors::AgdError;

/// Header carrying the dashboard password on protected routes.
pub const PASSWORD_HEADER: &str = "x-dashboard-password";

/// SHA-256 of the configured password, kept instead of the plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest([u8; 32]);

impl PasswordDigest {
    #[must_use]
    pub fn of(password: &str) -> Self {
        Self(Sha256::digest(password.as_bytes()).into())
    }

    /// Compare digests without short-circuiting on the first differing byte.
    #[must_use]
    pub fn matches(&self, supplied: &str) -> bool {
        let other = Self::of(supplied);
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Gate for dashboard routes. Open when no password is configured.
pub fn check(expected: Option<&PasswordDigest>, headers: &HeaderMap) -> Result<(), AgdError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let supplied = headers
        .get(PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if expected.matches(supplied) {
        Ok(())
    } else {
        Err(AgdError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn digest_matches_only_same_password() {
        let digest = PasswordDigest::of("s3cret");
        assert!(digest.matches("s3cret"));
        assert!(!digest.matches("s3cret "));
        assert!(!digest.matches(""));
    }

    #[test]
    fn open_without_configured_password() {
        assert!(check(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn header_is_required_when_configured() {
        let digest = PasswordDigest::of("s3cret");
        assert!(matches!(
            check(Some(&digest), &HeaderMap::new()),
            Err(AgdError::Unauthorized)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(PASSWORD_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check(Some(&digest), &headers).is_ok());
    }

    #[test]
    fn debug_hides_digest() {
        assert_eq!(format!("{:?}", PasswordDigest::of("x")), "PasswordDigest(..)");
    }
}
