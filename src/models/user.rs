use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    // Never serialized into any response.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection: everything sensitive stripped.
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct BriefUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for BriefUser {
    fn from(user: &User) -> Self {
        BriefUser {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// Decoded token payload. Only `TokenIssuer::verify` produces one, so a
/// handler holding `Claims` is holding a verified identity.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: usize,  // Expiration time
    pub iat: usize,  // Issued at
}
