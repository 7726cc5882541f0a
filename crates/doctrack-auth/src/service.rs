//! Authentication service: login, logout, registration and per-request
//! token authentication.

use chrono::{Duration, Utc};
use doctrack_core::error::{DocTrackError, DocTrackResult};
use doctrack_core::models::session::CreateSession;
use doctrack_core::models::user::{User, UserRole, UserStatus};
use doctrack_core::policy::INTAKE_DESK;
use doctrack_core::repository::{SessionRepository, UserRepository};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::directory::{UserInput, validate_new_user};
use crate::error::AuthError;
use crate::password;
use crate::token;

const INTAKE_DESK_BY_ADMIN: &str = "The intake desk department can only be assigned by an administrator.";

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub session_id: Uuid,
    pub user: User,
}

/// A request principal resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session_id: Uuid,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate.
pub struct AuthService<U: UserRepository, S: SessionRepository> {
    user_repo: U,
    session_repo: S,
    config: AuthConfig,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S> {
    pub fn new(user_repo: U, session_repo: S, config: AuthConfig) -> Self {
        Self {
            user_repo,
            session_repo,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Verify email + password, open a session and issue its token.
    pub async fn login(&self, input: LoginInput) -> DocTrackResult<LoginOutput> {
        let email = input.email.trim().to_lowercase();

        let user = match self.user_repo.get_by_email(&email).await {
            Ok(u) => u,
            Err(DocTrackError::NotFound { .. }) => {
                warn!(email = %email, "Login for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if user.status != UserStatus::Active {
            return Err(AuthError::AccountInactive.into());
        }

        // The session id is allocated up front so the token can carry it;
        // the session then stores the token's hash.
        let session_id = Uuid::new_v4();
        let access_token = token::issue_access_token(&user, session_id, &self.config)?;
        let expires_at = Utc::now() + Duration::seconds(self.config.token_lifetime_secs as i64);

        self.session_repo
            .create(CreateSession {
                id: session_id,
                user_id: user.id,
                token_hash: token::hash_token(&access_token),
                ip_address: input.ip_address,
                user_agent: input.user_agent,
                expires_at,
            })
            .await?;

        info!(user_id = %user.id, session_id = %session_id, "User logged in");

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.token_lifetime_secs,
            session_id,
            user,
        })
    }

    /// Resolve a raw bearer token to its user and live session.
    pub async fn authenticate(&self, raw_token: &str) -> DocTrackResult<Authenticated> {
        let claims = token::decode_access_token(raw_token, &self.config)?;
        let session_id = claims.session_id()?;

        let session = match self.session_repo.get_by_id(session_id).await {
            Ok(s) => s,
            Err(DocTrackError::NotFound { .. }) => return Err(AuthError::SessionRevoked.into()),
            Err(e) => return Err(e),
        };
        if session.token_hash != token::hash_token(raw_token) {
            return Err(AuthError::TokenInvalid("token does not match session".into()).into());
        }
        if session.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired.into());
        }

        let user = match self.user_repo.get_by_id(session.user_id).await {
            Ok(u) => u,
            Err(DocTrackError::NotFound { .. }) => return Err(AuthError::SessionRevoked.into()),
            Err(e) => return Err(e),
        };
        if user.status != UserStatus::Active {
            return Err(AuthError::AccountInactive.into());
        }

        Ok(Authenticated { user, session_id })
    }

    /// End a session. Storage failures surface as a generic internal
    /// error.
    pub async fn logout(&self, session_id: Uuid) -> DocTrackResult<()> {
        self.session_repo
            .invalidate(session_id)
            .await
            .map_err(|e| {
                error!(session_id = %session_id, error = %e, "Logout failed");
                DocTrackError::Internal("Failed to logout, please try again".into())
            })?;
        info!(session_id = %session_id, "User logged out");
        Ok(())
    }

    /// Self-service registration. Always creates an active plain user.
    /// The intake desk sees every record, so membership in it is only
    /// granted by an administrator.
    pub async fn register(&self, input: UserInput) -> DocTrackResult<User> {
        let input = UserInput {
            role: Some(UserRole::User.as_str().into()),
            status: Some(UserStatus::Active.as_str().into()),
            ..input
        };
        let intake_desk = input
            .department
            .as_deref()
            .is_some_and(|d| d.trim().eq_ignore_ascii_case(INTAKE_DESK));

        let create = validate_new_user(input, self.config.min_password_length).map_err(|e| match e {
            DocTrackError::Validation(mut errors) if intake_desk => {
                errors.add("department", INTAKE_DESK_BY_ADMIN);
                DocTrackError::Validation(errors)
            }
            other => other,
        })?;
        if intake_desk {
            warn!("Registration requested intake desk membership");
            return Err(DocTrackError::invalid("department", INTAKE_DESK_BY_ADMIN));
        }
        let user = self.user_repo.create(create).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Revoke all sessions for a user (e.g. on password change).
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> DocTrackResult<()> {
        self.session_repo.invalidate_user_sessions(user_id).await
    }

    /// Remove expired session rows.
    pub async fn cleanup_expired_sessions(&self) -> DocTrackResult<u64> {
        self.session_repo.cleanup_expired().await
    }
}
