//! Signed, time-limited access tokens.
//!
//! Tokens are HS256 JWTs over a shared secret. The claims carry the username
//! and role; nothing else about the user is trusted from the token.

use crate::users::{Role, User};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("cannot sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    duration: Duration,
}

impl TokenManager {
    pub fn new(secret: &[u8], duration: Duration) -> TokenManager {
        // Expiry is checked against the caller's clock in `verify_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        TokenManager {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn generate(&self, user: &User) -> Result<String, TokenError> {
        self.generate_at(user, SystemTime::now())
    }

    /// Issues a token as if the current time were `issued_at`
    pub fn generate_at(&self, user: &User, issued_at: SystemTime) -> Result<String, TokenError> {
        let iat = unix_seconds(issued_at).map_err(TokenError::Signing)?;
        let claims = UserClaims {
            sub: user.username.clone(),
            role: user.role,
            iat,
            exp: iat + self.duration.as_secs(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<UserClaims, TokenError> {
        self.verify_at(token, SystemTime::now())
    }

    /// Verifies a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: SystemTime) -> Result<UserClaims, TokenError> {
        let data = jsonwebtoken::decode::<UserClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Invalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        let now = unix_seconds(now).map_err(TokenError::Malformed)?;
        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn unix_seconds(time: SystemTime) -> Result<u64, String> {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}
