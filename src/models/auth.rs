use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in the access token issued by the login layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub exp: usize,
    pub iat: usize,
}

/// The acting user, extracted from the validated JWT and passed explicitly
/// into every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}
