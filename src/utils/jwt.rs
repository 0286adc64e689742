use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id (uuid)
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::AuthError("Malformed subject in access token".to_string()))
    }
}

/// Access tokens are issued by the identity service; this side only needs to
/// verify them. Issuing is kept for tooling and tests.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    pub fn generate_access_token(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let jwt = JwtService::new("secret", 60);
        let user_id = Uuid::new_v4();

        let token = jwt.generate_access_token(user_id).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtService::new("secret-a", 60);
        let verifier = JwtService::new("secret-b", 60);
        let token = issuer.generate_access_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            verifier.verify_access_token(&token),
            Err(AppError::JwtError(_))
        ));
    }

    #[test]
    fn non_uuid_subject_is_an_auth_error() {
        let claims = Claims {
            sub: "42".to_string(),
            exp: 0,
            iat: 0,
            token_type: "access".to_string(),
        };
        assert!(matches!(claims.user_id(), Err(AppError::AuthError(_))));
    }
}
