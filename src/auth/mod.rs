//! Firebase ID token verification for incoming requests.

pub mod keys;
pub mod verifier;

pub use verifier::{FirebaseTokenClaims, IdTokenVerifier, TokenVerificationError};

/// Something that can turn a bearer token into verified Firebase claims.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FirebaseTokenClaims, TokenVerificationError>;
}
