use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    exp: usize,
    iat: usize,
    sub: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// HS256 access tokens whose subject is the admin id.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires: TimeDelta,
}

impl TokenService {
    pub fn new(secret_key: &str, access_token_expires: TimeDelta) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_ref()),
            decoding_key: DecodingKey::from_secret(secret_key.as_ref()),
            access_token_expires,
        }
    }

    pub fn issue(&self, admin_id: Uuid) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            exp: (now + self.access_token_expires).timestamp() as usize,
            iat: now.timestamp() as usize,
            sub: admin_id.to_string(),
        };
        let access_token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_expires.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}
