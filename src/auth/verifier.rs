use super::keys::{KeyFetchError, PublicKeyManager};
use super::TokenVerifier;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerated clock skew for `auth_time`, in seconds.
const AUTH_TIME_SKEW: i64 = 300;

#[derive(Error, Debug)]
pub enum TokenVerificationError {
    #[error("Key fetch error: {0}")]
    KeyFetchError(#[from] KeyFetchError),
    #[error("JWT validation error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseTokenClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub auth_time: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Verifies Firebase ID tokens for one project.
pub struct IdTokenVerifier {
    project_id: String,
    key_manager: PublicKeyManager,
}

impl IdTokenVerifier {
    pub fn new(project_id: String) -> Self {
        Self::with_key_manager(project_id, PublicKeyManager::new())
    }

    pub fn with_key_manager(project_id: String, key_manager: PublicKeyManager) -> Self {
        Self {
            project_id,
            key_manager,
        }
    }

    pub async fn verify_token(
        &self,
        token: &str,
    ) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| TokenVerificationError::InvalidToken("Missing kid in header".to_string()))?;

        let jwk = self.key_manager.get_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let claims = decode::<FirebaseTokenClaims>(token, &key, &validation)?.claims;
        check_claims(&claims, chrono::Utc::now().timestamp())?;
        Ok(claims)
    }
}

// Checks jsonwebtoken does not cover: non-empty subject and an auth_time not in the future.
fn check_claims(claims: &FirebaseTokenClaims, now: i64) -> Result<(), TokenVerificationError> {
    if claims.sub.is_empty() {
        return Err(TokenVerificationError::InvalidToken(
            "Subject (sub) claim must not be empty".to_string(),
        ));
    }
    if claims.auth_time > now + AUTH_TIME_SKEW {
        return Err(TokenVerificationError::InvalidToken(
            "Auth time is in the future".to_string(),
        ));
    }
    Ok(())
}

#[async_trait::async_trait]
impl TokenVerifier for IdTokenVerifier {
    async fn verify(&self, token: &str) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        self.verify_token(token).await
    }
}
