use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clap::ValueEnum;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMode {
    ApiKey,
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JwtAlgorithm {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Es256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtKeyKind {
    Secret,
    RsaPublicKey,
    EcPublicKey,
}

impl JwtAlgorithm {
    pub fn algorithm(self) -> Algorithm {
        match self {
            JwtAlgorithm::Hs256 => Algorithm::HS256,
            JwtAlgorithm::Hs384 => Algorithm::HS384,
            JwtAlgorithm::Hs512 => Algorithm::HS512,
            JwtAlgorithm::Rs256 => Algorithm::RS256,
            JwtAlgorithm::Es256 => Algorithm::ES256,
        }
    }

    pub fn key_kind(self) -> JwtKeyKind {
        match self {
            JwtAlgorithm::Hs256 | JwtAlgorithm::Hs384 | JwtAlgorithm::Hs512 => JwtKeyKind::Secret,
            JwtAlgorithm::Rs256 => JwtKeyKind::RsaPublicKey,
            JwtAlgorithm::Es256 => JwtKeyKind::EcPublicKey,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_public_key: Option<String>,
    pub jwt_algorithm: JwtAlgorithm,
}

/// The authenticated requester. Matches are always computed for this user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AuthConfig::from_ref(state);

        match config.mode {
            AuthMode::ApiKey => authorize_api_key(parts, &config),
            AuthMode::Jwt => authorize_jwt(parts, &config),
        }
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn authorize_api_key(parts: &Parts, config: &AuthConfig) -> Result<AuthUser, ApiError> {
    let expected = config
        .api_key
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("missing NM_API_KEY".into()))?;

    let provided = header_value(parts, "x-api-key")
        .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

    if provided != expected {
        return Err(ApiError::Unauthorized("invalid API key".into()));
    }

    let user_id = header_value(parts, USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".into()))?;

    Ok(AuthUser {
        user_id: user_id.to_string(),
    })
}

fn decoding_key(config: &AuthConfig) -> Result<DecodingKey, ApiError> {
    match config.jwt_algorithm.key_kind() {
        JwtKeyKind::Secret => config
            .jwt_secret
            .as_deref()
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()))
            .ok_or_else(|| ApiError::Internal("missing JWT_SECRET".into())),
        kind => {
            let pem = config
                .jwt_public_key
                .as_deref()
                .ok_or_else(|| ApiError::Internal("missing JWT_PUBLIC_KEY".into()))?;
            let key = if kind == JwtKeyKind::RsaPublicKey {
                DecodingKey::from_rsa_pem(pem.as_bytes())
            } else {
                DecodingKey::from_ec_pem(pem.as_bytes())
            };
            key.map_err(|err| ApiError::Internal(format!("invalid JWT_PUBLIC_KEY: {err}")))
        }
    }
}

fn authorize_jwt(parts: &Parts, config: &AuthConfig) -> Result<AuthUser, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("expected Bearer token".into()))?;

    let key = decoding_key(config)?;
    let validation = Validation::new(config.jwt_algorithm.algorithm());

    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|err| ApiError::Unauthorized(format!("invalid token: {err}")))?;

    let user_id = data.claims.sub.trim();
    if user_id.is_empty() {
        return Err(ApiError::Unauthorized("token subject is empty".into()));
    }

    Ok(AuthUser {
        user_id: user_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    const SECRET: &str = "unit-test-secret";
    // 2100-01-01T00:00:00Z
    const FAR_FUTURE: u64 = 4_102_444_800;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
    }

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/matches");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn api_key_config() -> AuthConfig {
        AuthConfig {
            mode: AuthMode::ApiKey,
            api_key: Some("k".into()),
            jwt_secret: None,
            jwt_public_key: None,
            jwt_algorithm: JwtAlgorithm::Hs256,
        }
    }

    fn jwt_config(algorithm: JwtAlgorithm) -> AuthConfig {
        AuthConfig {
            mode: AuthMode::Jwt,
            api_key: None,
            jwt_secret: Some(SECRET.into()),
            jwt_public_key: None,
            jwt_algorithm: algorithm,
        }
    }

    fn token(algorithm: Algorithm, sub: &str) -> String {
        encode(
            &Header::new(algorithm),
            &TestClaims {
                sub,
                exp: FAR_FUTURE,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn api_key_requires_user_header() {
        let config = api_key_config();

        let user = authorize_api_key(&parts(&[("x-api-key", "k"), ("x-user-id", " u1 ")]), &config)
            .unwrap();
        assert_eq!(user.user_id, "u1");

        assert!(matches!(
            authorize_api_key(&parts(&[("x-api-key", "k")]), &config),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize_api_key(&parts(&[("x-api-key", "nope"), ("x-user-id", "u1")]), &config),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn jwt_subject_becomes_requester() {
        let config = jwt_config(JwtAlgorithm::Hs512);
        let bearer = format!("Bearer {}", token(Algorithm::HS512, "user-42"));

        let user = authorize_jwt(&parts(&[("authorization", &bearer)]), &config).unwrap();
        assert_eq!(user.user_id, "user-42");
    }

    #[test]
    fn jwt_with_wrong_algorithm_is_rejected() {
        let config = jwt_config(JwtAlgorithm::Hs512);
        let bearer = format!("Bearer {}", token(Algorithm::HS256, "user-42"));

        assert!(matches!(
            authorize_jwt(&parts(&[("authorization", &bearer)]), &config),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn key_kind_follows_algorithm_family() {
        assert_eq!(JwtAlgorithm::Hs384.key_kind(), JwtKeyKind::Secret);
        assert_eq!(JwtAlgorithm::Rs256.key_kind(), JwtKeyKind::RsaPublicKey);
        assert_eq!(JwtAlgorithm::Es256.key_kind(), JwtKeyKind::EcPublicKey);
    }
}
