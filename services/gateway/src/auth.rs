//! Demo bearer-token authentication. A real deployment replaces this
//! with its own identity provider and passes an equivalent lookup into
//! the upgrade handler -- the manager itself never looks inside a token.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;
use ws_core::AuthError;

#[derive(Debug, Clone)]
pub struct UserData {
    pub display_name: String,
}

#[derive(Debug, Clone)]
struct TokenRecord {
    user_id: i64,
    display_name: String,
}

/// In-memory token -> user mapping. No expiry, no revocation, no
/// persistence across restarts: it exists only to make the upgrade
/// endpoint exercisable without a real identity provider.
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
    next_user_id: AtomicI64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            next_user_id: AtomicI64::new(1),
        }
    }

    pub fn issue(&self, display_name: String) -> (i64, String) {
        let user_id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
        let token = Uuid::new_v4().to_string();
        self.tokens.write().insert(
            token.clone(),
            TokenRecord {
                user_id,
                display_name,
            },
        );
        (user_id, token)
    }

    pub fn validate(&self, token: &str) -> Result<(i64, UserData), AuthError> {
        self.tokens
            .read()
            .get(token)
            .map(|record| {
                (
                    record.user_id,
                    UserData {
                        display_name: record.display_name.clone(),
                    },
                )
            })
            .ok_or_else(|| AuthError("invalid or expired token".to_string()))
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_back_to_the_same_user() {
        let store = TokenStore::new();
        let (user_id, token) = store.issue("alice".to_string());
        let (validated_id, data) = store.validate(&token).unwrap();
        assert_eq!(validated_id, user_id);
        assert_eq!(data.display_name, "alice");
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = TokenStore::new();
        assert!(store.validate("not-a-real-token").is_err());
    }

    #[test]
    fn extract_bearer_strips_the_prefix() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
    }
}
