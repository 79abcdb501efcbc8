use crate::db::Database;
use crate::models::user::User;
use bincode::{Decode, Encode};
use chrono::Utc;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use std::str;
use thiserror::Error;
use tracing::info;

const USERS_TREE: &str = "users";
const USERNAME_INDEX_TREE: &str = "username_index";

/// Store-level failure taxonomy. The service maps these onto its own
/// error kinds per operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("record not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("corrupt record: {0}")]
    Codec(String),
}

/// Optional field updates applied to an existing record. `None` leaves the
/// stored value untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Encode, Decode)]
struct StoredUser {
    id: String,
    username: String,
    display_name: String,
    password_hash: String,
    created_at: i64, // Store as timestamp
    updated_at: i64,
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        StoredUser {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            password_hash: user.password_hash,
            created_at: user.created_at.timestamp(),
            updated_at: user.updated_at.timestamp(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: stored.id,
            username: stored.username,
            display_name: stored.display_name,
            password_hash: stored.password_hash,
            created_at: chrono::DateTime::from_timestamp(stored.created_at, 0)
                .unwrap_or_else(chrono::Utc::now),
            updated_at: chrono::DateTime::from_timestamp(stored.updated_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

fn encode(stored: &StoredUser) -> Result<Vec<u8>, StoreError> {
    bincode::encode_to_vec(stored, bincode::config::standard())
        .map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode(raw: &[u8]) -> Result<StoredUser, StoreError> {
    let (stored, _): (StoredUser, usize) =
        bincode::decode_from_slice(raw, bincode::config::standard())
            .map_err(|e| StoreError::Codec(e.to_string()))?;
    Ok(stored)
}

fn unwrap_transaction(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => StoreError::Backend(err),
    }
}

pub struct UserRepository {
    users: sled::Tree,
    usernames: sled::Tree,
}

impl UserRepository {
    pub fn new(db: &Database) -> Result<Self, StoreError> {
        Ok(UserRepository {
            users: db.db.open_tree(USERS_TREE)?,
            usernames: db.db.open_tree(USERNAME_INDEX_TREE)?,
        })
    }

    /// Insert a new user. The record and its username index entry are
    /// written in one transaction, so two racing inserts of the same
    /// username resolve to exactly one winner inside the store.
    pub async fn insert(&self, user: User) -> Result<(), StoreError> {
        let stored = StoredUser::from(user);
        let encoded = encode(&stored)?;

        (&self.users, &self.usernames)
            .transaction(|(users, usernames)| {
                if usernames.get(stored.username.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        StoreError::UniqueViolation,
                    ));
                }
                usernames.insert(stored.username.as_bytes(), stored.id.as_bytes())?;
                users.insert(stored.id.as_bytes(), encoded.as_slice())?;
                Ok(())
            })
            .map_err(unwrap_transaction)?;

        info!(user_id = %stored.id, username = %stored.username, "User created in database");

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<User, StoreError> {
        match self.users.get(id.as_bytes())? {
            Some(raw) => Ok(User::from(decode(&raw)?)),
            None => Err(StoreError::NotFound),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        match self.usernames.get(username.as_bytes())? {
            Some(id_raw) => {
                let id = str::from_utf8(&id_raw)
                    .map_err(|e| StoreError::Codec(format!("invalid user id in index: {}", e)))?;
                match self.users.get(id.as_bytes())? {
                    Some(raw) => Ok(User::from(decode(&raw)?)),
                    // Index entry without a record means the store is
                    // corrupt, not that the user is absent.
                    None => Err(StoreError::Codec(format!(
                        "dangling username index for '{}'",
                        username
                    ))),
                }
            }
            None => Err(StoreError::NotFound),
        }
    }

    /// Fetch a window of users ordered by id. An empty window is a valid
    /// empty result, never an error.
    pub async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        for entry in self.users.iter().skip(offset).take(limit) {
            let (_, raw) = entry?;
            users.push(User::from(decode(&raw)?));
        }
        Ok(users)
    }

    /// Apply field changes to an existing record. Not an upsert: a missing
    /// id fails with `NotFound` and nothing is written. A username change
    /// re-checks uniqueness and swaps the index entry in the same
    /// transaction.
    pub async fn update_by_id(&self, id: &str, changes: &UserChanges) -> Result<(), StoreError> {
        (&self.users, &self.usernames)
            .transaction(|(users, usernames)| {
                let raw = match users.get(id.as_bytes())? {
                    Some(raw) => raw,
                    None => return Err(ConflictableTransactionError::Abort(StoreError::NotFound)),
                };
                let mut stored = decode(&raw).map_err(ConflictableTransactionError::Abort)?;

                if let Some(username) = &changes.username {
                    if *username != stored.username {
                        if usernames.get(username.as_bytes())?.is_some() {
                            return Err(ConflictableTransactionError::Abort(
                                StoreError::UniqueViolation,
                            ));
                        }
                        usernames.remove(stored.username.as_bytes())?;
                        usernames.insert(username.as_bytes(), id.as_bytes())?;
                        stored.username = username.clone();
                    }
                }
                if let Some(display_name) = &changes.display_name {
                    stored.display_name = display_name.clone();
                }
                if let Some(password_hash) = &changes.password_hash {
                    stored.password_hash = password_hash.clone();
                }
                stored.updated_at = Utc::now().timestamp();

                let encoded = encode(&stored).map_err(ConflictableTransactionError::Abort)?;
                users.insert(id.as_bytes(), encoded)?;
                Ok(())
            })
            .map_err(unwrap_transaction)?;

        info!(user_id = %id, "User updated in database");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: "Test User".to_string(),
            password_hash: "hashed_password".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn test_repo() -> UserRepository {
        let db = Database::temporary().unwrap();
        UserRepository::new(&db).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = test_repo();
        let user = test_user("alice");

        repo.insert(user.clone()).await.unwrap();

        let by_id = repo.find_by_id(&user.id).await.unwrap();
        assert_eq!(by_id.username, "alice");

        let by_username = repo.find_by_username("alice").await.unwrap();
        assert_eq!(by_username.id, user.id);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let repo = test_repo();

        assert!(matches!(
            repo.find_by_id("no-such-id").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            repo.find_by_username("nobody").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = test_repo();
        repo.insert(test_user("bob")).await.unwrap();

        let result = repo.insert(test_user("bob")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_inserts_one_winner() {
        let repo = std::sync::Arc::new(test_repo());

        let a = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(test_user("carol")).await })
        };
        let b = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(test_user("carol")).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::UniqueViolation)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn test_list_page_window() {
        let repo = test_repo();
        for i in 0..25 {
            repo.insert(test_user(&format!("user{:02}", i))).await.unwrap();
        }

        let all = repo.list_page(0, 25).await.unwrap();
        assert_eq!(all.len(), 25);

        // Second page of 10 must be exactly rows 10..19 of the same order.
        let page = repo.list_page(10, 10).await.unwrap();
        assert_eq!(page.len(), 10);
        for (i, user) in page.iter().enumerate() {
            assert_eq!(user.id, all[10 + i].id);
        }
    }

    #[tokio::test]
    async fn test_list_page_empty_store() {
        let repo = test_repo();
        let users = repo.list_page(0, 20).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_list_page_past_end() {
        let repo = test_repo();
        repo.insert(test_user("dave")).await.unwrap();

        let users = repo.list_page(20, 20).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_update_fields() {
        let repo = test_repo();
        let user = test_user("erin");
        repo.insert(user.clone()).await.unwrap();

        repo.update_by_id(
            &user.id,
            &UserChanges {
                username: Some("erin2".to_string()),
                display_name: Some("Erin Two".to_string()),
                password_hash: Some("new_hash".to_string()),
            },
        )
        .await
        .unwrap();

        let updated = repo.find_by_id(&user.id).await.unwrap();
        assert_eq!(updated.username, "erin2");
        assert_eq!(updated.display_name, "Erin Two");
        assert_eq!(updated.password_hash, "new_hash");

        // Old username must no longer resolve; new one must.
        assert!(matches!(
            repo.find_by_username("erin").await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(repo.find_by_username("erin2").await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let repo = test_repo();
        let result = repo
            .update_by_id(
                "no-such-id",
                &UserChanges {
                    display_name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_username_collision_leaves_record_unchanged() {
        let repo = test_repo();
        let frank = test_user("frank");
        let grace = test_user("grace");
        repo.insert(frank.clone()).await.unwrap();
        repo.insert(grace.clone()).await.unwrap();

        let result = repo
            .update_by_id(
                &grace.id,
                &UserChanges {
                    username: Some("frank".to_string()),
                    display_name: Some("Should Not Stick".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::UniqueViolation)));

        let unchanged = repo.find_by_id(&grace.id).await.unwrap();
        assert_eq!(unchanged.username, "grace");
        assert_eq!(unchanged.display_name, grace.display_name);
    }

    #[tokio::test]
    async fn test_update_same_username_is_noop_on_index() {
        let repo = test_repo();
        let user = test_user("heidi");
        repo.insert(user.clone()).await.unwrap();

        repo.update_by_id(
            &user.id,
            &UserChanges {
                username: Some("heidi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.find_by_username("heidi").await.unwrap().id, user.id);
    }
}
