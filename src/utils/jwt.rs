use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session claims issued by the identity provider.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Claims {
    /// Opaque user identifier.
    pub sub: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize,
}

pub struct JWT {
    secret: String,
}

impl JWT {
    pub fn init(secret: &str) -> Self {
        JWT {
            secret: secret.to_string(),
        }
    }

    pub fn sign(
        &self,
        user_id: &str,
        is_admin: bool,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            is_admin,
            exp,
        };
        let encoded_secret = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), &claims, &encoded_secret)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validations = Validation::new(Algorithm::HS256);
        validations.validate_exp = true;
        let decoded_token = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validations,
        )?;
        Ok(decoded_token.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_decode() {
        let jwt = JWT::init("Garden");
        let token = jwt.sign("user-1", true, Duration::hours(1)).unwrap();
        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.is_admin);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = JWT::init("Garden");
        let token = jwt.sign("user-1", false, Duration::hours(-2)).unwrap();
        assert!(jwt.decode(&token).is_err());
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = JWT::init("Garden").sign("user-1", false, Duration::hours(1)).unwrap();
        assert!(JWT::init("Catalog").decode(&token).is_err());
    }
}
