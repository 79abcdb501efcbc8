use crate::db::user_repository::{StoreError, UserChanges, UserRepository};
use crate::errors::AuthError;
use crate::models::user::{BriefUser, User};
use crate::pagination::PageRequest;
use crate::utils::auth::{hash_password, verify_password, TokenIssuer};
use crate::utils::otp::generate_otp;
use chrono::Utc;
use tracing::info;

/// Sign-up input, already format-validated by the request adapter.
#[derive(Debug)]
pub struct SignUpInput {
    pub username: String,
    pub display_name: String,
    pub password: String,
}

/// Optional self-update fields, already format-validated by the adapter.
#[derive(Debug, Default)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
}

/// Session credential plus the secondary one-time code handed out at login.
#[derive(Debug)]
pub struct LogInOutput {
    pub token: String,
    pub otp: String,
}

/// The account core: orchestrates sign-up, login, identity lookup, listing
/// and self-update against the credential store and token issuer. Holds no
/// mutable state of its own; all durable state lives in the store.
pub struct AuthService {
    repo: UserRepository,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(repo: UserRepository, tokens: TokenIssuer) -> Self {
        AuthService { repo, tokens }
    }

    /// Create an account. Uniqueness is decided by the store's constraint,
    /// not by a pre-check here.
    pub async fn sign_up(&self, input: SignUpInput) -> Result<(), AuthError> {
        let password_hash = hash_password(&input.password)
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {}", e)))?;

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: input.username,
            display_name: input.display_name,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        match self.repo.insert(user).await {
            Ok(()) => Ok(()),
            Err(StoreError::UniqueViolation) => Err(AuthError::UsernameAlreadyExists),
            Err(err) => Err(AuthError::Persistence(err.to_string())),
        }
    }

    /// Authenticate and mint credentials. A missing user and a wrong
    /// password share one arm, so the caller cannot tell which it was.
    pub async fn log_in(&self, username: &str, password: &str) -> Result<LogInOutput, AuthError> {
        let user = match self.repo.find_by_username(username).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(err) => return Err(AuthError::Persistence(err.to_string())),
        };

        match user {
            Some(user) if verify_password(password, &user.password_hash) => {
                let token = self.tokens.issue(&user.id)?;
                let otp = generate_otp();
                info!(user_id = %user.id, "User logged in");
                Ok(LogInOutput { token, otp })
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Fetch the caller's own record; `user_id` must come from verified
    /// claims, never from client input.
    pub async fn get_single_user(&self, user_id: &str) -> Result<User, AuthError> {
        match self.repo.find_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(AuthError::UserNotFound),
            Err(err) => Err(AuthError::Persistence(err.to_string())),
        }
    }

    /// Page through brief projections in stable id order. An empty window
    /// is an empty success.
    pub async fn get_brief_users(&self, page: PageRequest) -> Result<Vec<BriefUser>, AuthError> {
        match self.repo.list_page(page.offset(), page.limit as usize).await {
            Ok(users) => Ok(users.iter().map(BriefUser::from).collect()),
            Err(err) => Err(AuthError::Persistence(err.to_string())),
        }
    }

    /// Self-update: username uniqueness re-checked by the store, password
    /// re-hashed here when supplied. Never an upsert.
    pub async fn update_user(
        &self,
        user_id: &str,
        input: UpdateUserInput,
    ) -> Result<(), AuthError> {
        let password_hash = match &input.password {
            Some(password) => Some(
                hash_password(password)
                    .map_err(|e| AuthError::Internal(format!("failed to hash password: {}", e)))?,
            ),
            None => None,
        };

        let changes = UserChanges {
            username: input.username,
            display_name: input.display_name,
            password_hash,
        };

        match self.repo.update_by_id(user_id, &changes).await {
            Ok(()) => {
                info!(user_id = %user_id, "User profile updated");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::UserNotFound),
            Err(StoreError::UniqueViolation) => Err(AuthError::UsernameAlreadyExists),
            Err(err) => Err(AuthError::Persistence(err.to_string())),
        }
    }

    #[allow(dead_code)]
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }
}
