use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    error::AppError,
    models::auth::{AuthenticatedUser, Claims},
    services::rbac::AccessIndex,
    AppState,
};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let secret = parts.extensions.get::<JwtSecret>().ok_or_else(|| {
            tracing::error!("JWT secret extension missing from router");
            AppError::Unauthorized
        })?;

        decode_access_token(token, &secret.0).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::Unauthorized
        })
    }
}

/// The caller's admissions, loaded once per request.
impl FromRequestParts<AppState> for AccessIndex {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        AccessIndex::load(&state.db, user.user_id).await
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub fn decode_access_token(token: &str, secret: &str) -> anyhow::Result<AuthenticatedUser> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(AuthenticatedUser { user_id: data.claims.sub.parse()? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(sub: &str, exp: usize, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims { sub: sub.to_string(), exp, iat: now };
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap()
    }

    fn in_an_hour() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn decodes_subject_into_user_id() {
        let id = Uuid::new_v4();
        let token = token(&id.to_string(), in_an_hour(), "s3cret");
        let user = decode_access_token(&token, "s3cret").unwrap();
        assert_eq!(user.user_id, id);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let id = Uuid::new_v4().to_string();
        assert!(decode_access_token(&token(&id, in_an_hour(), "a"), "b").is_err());
        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        assert!(decode_access_token(&token(&id, expired, "a"), "a").is_err());
    }

    #[test]
    fn rejects_non_uuid_subject() {
        assert!(decode_access_token(&token("alice", in_an_hour(), "a"), "a").is_err());
    }
}
