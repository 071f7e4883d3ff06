use application::auth::{TokenService, UserClaims};
use application::error::AppError;
use bcrypt::hash as bcrypt_hash;
use bcrypt::verify as bcrypt_verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub trait AuthConfig {
    fn jwt_secret(&self) -> &str;
    fn jwt_expire_secs(&self) -> i64;
    fn salt_cost(&self) -> i32;
}

#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    salt_cost: i32,
}

impl BcryptPasswordHasher {
    pub fn new(salt_cost: i32) -> Self {
        Self { salt_cost }
    }
}

impl application::auth::PasswordHasher for BcryptPasswordHasher {
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        bcrypt_hash(plain, self.salt_cost as u32).map_err(|e| AppError::Internal(e.to_string()))
    }

    fn verify(&self, pwd: &str, hashed_pwd: &str) -> Result<(), AppError> {
        if bcrypt_verify(pwd, hashed_pwd).unwrap_or(false) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "invalid username or password".to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtTokenService {
    jwt_secret: String,
    exp_secs: i64,
}

impl JwtTokenService {
    pub fn new(jwt_secret: &str, exp_secs: i64) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            exp_secs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    pub sub: String, // user id
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl JwtClaims {
    fn new(claims: &UserClaims, exp_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: claims.user_id.to_string(),
            name: claims.user_name.clone(),
            exp: now + exp_secs,
            iat: now,
        }
    }
}

impl TryFrom<JwtClaims> for UserClaims {
    type Error = AppError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized(format!("invalid token subject: {}", claims.sub)))?;
        Ok(Self {
            user_id,
            user_name: claims.name,
        })
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, claims: &UserClaims) -> Result<String, AppError> {
        let claims: JwtClaims = JwtClaims::new(claims, self.exp_secs);
        let key = EncodingKey::from_secret(self.jwt_secret.as_bytes());
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &key).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<UserClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        token_data.claims.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::auth::PasswordHasher;

    fn claims() -> UserClaims {
        UserClaims {
            user_id: 42,
            user_name: "alice".to_string(),
        }
    }

    #[test]
    fn test_token_round_trip_carries_user_id() {
        let svc = JwtTokenService::new("secret", 60);
        let token = svc.issue(&claims()).unwrap();
        assert_eq!(svc.verify(&token).unwrap(), claims());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = JwtTokenService::new("one", 60).issue(&claims()).unwrap();
        assert!(matches!(
            JwtTokenService::new("two", 60).verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // 超过 jsonwebtoken 默认 60 秒的 leeway
        let svc = JwtTokenService::new("secret", -120);
        let token = svc.issue(&claims()).unwrap();
        assert!(matches!(svc.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_bcrypt_hash_and_verify() {
        let hasher = BcryptPasswordHasher::new(4);
        let hashed = hasher.hash("pwd").unwrap();
        assert!(hasher.verify("pwd", &hashed).is_ok());
        assert!(matches!(
            hasher.verify("other", &hashed),
            Err(AppError::Unauthorized(_))
        ));
    }
}
