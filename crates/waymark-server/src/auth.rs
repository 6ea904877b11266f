//! Identity provider: password hashing, signed session tokens, and viewer
//! resolution.
//!
//! Tokens are `base64url(claims).base64url(signature)` where the claims
//! carry the subject id and an expiry timestamp, signed with the server's
//! Ed25519 key. The core never sees a token; it only receives the resolved
//! [`Viewer`] record.

use argon2::password_hash::{rand_core::OsRng as SaltRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use waymark_core::{CoreError, SharedDatabase};
use waymark_shared::Viewer;
use waymark_store::StoreError;

use crate::error::ServerError;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash. An unparseable hash simply
/// fails verification.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Serialize, Deserialize)]
struct TokenClaims {
    /// Subject: the user id.
    sub: Uuid,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// Issues and verifies Ed25519-signed session tokens.
pub struct TokenSigner {
    signing_key: SigningKey,
}

impl TokenSigner {
    /// Restore a signer from a configured seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Generate an ephemeral signer. Tokens die with the process.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Issue a token for `user_id` that expires after `ttl_hours`.
    pub fn issue(&self, user_id: Uuid, ttl_hours: i64) -> Result<String, ServerError> {
        let claims = TokenClaims {
            sub: user_id,
            exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ServerError::Internal(format!("token encoding failed: {e}")))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

        let signature = self.signing_key.sign(payload_b64.as_bytes());
        Ok(format!(
            "{payload_b64}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, ServerError> {
        let (payload_b64, sig_b64) = token
            .split_once('.')
            .ok_or_else(|| ServerError::Unauthenticated("malformed token".to_string()))?;

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| ServerError::Unauthenticated("malformed token".to_string()))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| ServerError::Unauthenticated("malformed token".to_string()))?;

        self.signing_key
            .verifying_key()
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| ServerError::Unauthenticated("invalid token".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| ServerError::Unauthenticated("malformed token".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| ServerError::Unauthenticated("malformed token".to_string()))?;

        if claims.exp < Utc::now().timestamp() {
            return Err(ServerError::Unauthenticated("token expired".to_string()));
        }
        Ok(claims.sub)
    }
}

/// Resolve the bearer token in `headers` to a [`Viewer`] snapshot of the
/// user record.
pub async fn resolve_viewer(
    db: &SharedDatabase,
    signer: &TokenSigner,
    headers: &HeaderMap,
) -> Result<Viewer, ServerError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServerError::Unauthenticated("missing bearer token".to_string()))?;

    let user_id = signer.verify(token)?;

    let user = {
        let db = db.lock().await;
        db.get_user(user_id).map_err(|e| match e {
            StoreError::NotFound => ServerError::Unauthenticated("user not found".to_string()),
            other => ServerError::Core(CoreError::Store(other)),
        })?
    };

    Ok(Viewer {
        id: user.id,
        username: user.username,
        friends: user.friends,
        friend_requests: user.friend_requests,
        is_guest: user.is_guest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip() {
        let signer = TokenSigner::generate();
        let user_id = Uuid::new_v4();

        let token = signer.issue(user_id, 1).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn expired_token_rejected() {
        let signer = TokenSigner::generate();
        let token = signer.issue(Uuid::new_v4(), -1).unwrap();
        assert!(matches!(
            signer.verify(&token),
            Err(ServerError::Unauthenticated(_))
        ));
    }

    #[test]
    fn tampered_token_rejected() {
        let signer = TokenSigner::generate();
        let token = signer.issue(Uuid::new_v4(), 1).unwrap();

        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
        assert!(signer.verify(&tampered).is_err());

        // A token signed by a different key never verifies.
        let other = TokenSigner::generate();
        assert!(other.verify(&token).is_err());

        assert!(signer.verify("no-dot-here").is_err());
    }

    #[test]
    fn seeded_signers_are_deterministic() {
        let seed = [7u8; 32];
        let a = TokenSigner::from_seed(&seed);
        let b = TokenSigner::from_seed(&seed);

        let user_id = Uuid::new_v4();
        let token = a.issue(user_id, 1).unwrap();
        assert_eq!(b.verify(&token).unwrap(), user_id);
    }
}
