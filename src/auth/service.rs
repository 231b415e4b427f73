// Registration, login, and bearer verification

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenService;
use crate::core::errors::LedgerError;
use crate::core::models::Identity;
use crate::store::UserStore;
use std::sync::Arc;
use tracing::info;

const MIN_PASSWORD_LEN: usize = 8;

/// A freshly authenticated caller and the credential minted for them.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: Identity,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Create an account and mint its first credential. A taken username
    /// surfaces as `Conflict`.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthSession, LedgerError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::InvalidInput("username must not be empty".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let password_hash = hash_password(password)?;
        let user = self.users.create_user(username, &password_hash).await?;
        info!(user_id = user.id, username = %user.username, "User registered");

        self.session_for(user.identity())
    }

    /// Verify a username/password pair and mint a credential. Unknown user
    /// and wrong password collapse into one message so login does not leak
    /// which usernames exist.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, LedgerError> {
        let invalid = || LedgerError::Unauthenticated("invalid username or password".to_string());

        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        info!(user_id = user.id, username = %user.username, "User logged in");
        self.session_for(user.identity())
    }

    /// Resolve an `Authorization` header value into a verified identity.
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<Identity, LedgerError> {
        let header =
            header.ok_or_else(|| LedgerError::Unauthenticated("missing token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| LedgerError::Unauthenticated("missing token".to_string()))?;
        self.tokens.verify(token)
    }

    fn session_for(&self, user: Identity) -> Result<AuthSession, LedgerError> {
        let token = self.tokens.mint(&user)?;
        Ok(AuthSession { token, user })
    }
}
