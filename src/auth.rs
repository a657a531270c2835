// src/auth.rs
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::config_manager::AuthSettings;
use crate::core::{AppError, AppResult, Database};
use crate::models::User;
use crate::repositories::UserRepository;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// HS256 signing and verification keys built from the shared secret
pub struct AuthConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    default_ttl_hours: i64,
}

impl AuthConfig {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            issuer: settings.issuer.clone(),
            default_ttl_hours: settings.token_ttl_hours,
        }
    }

    /// Mint a bearer token for a user. `ttl_hours` falls back to the configured lifetime.
    pub fn issue_token(&self, user: &User, ttl_hours: Option<i64>) -> Result<String> {
        let now = Utc::now();
        let ttl = ttl_hours.unwrap_or(self.default_ttl_hours);
        if ttl <= 0 {
            anyhow::bail!("Token lifetime must be positive, got {} hours", ttl);
        }

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            org: user.current_org_id.map(|id| id.to_string()),
            iss: self.issuer.clone(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(ttl)).timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign token")
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

/// A verified bearer token together with the stored user it names
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// Organization the user currently works in
    pub fn org_id(&self) -> AppResult<Uuid> {
        self.user
            .current_org_id
            .ok_or_else(|| AppError::Forbidden("User is not attached to an organization".into()))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::DatabaseError)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let database = match req.guard::<&State<Database>>().await {
            Outcome::Success(db) => db,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::DatabaseError)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let token = match req.headers().get_one("Authorization") {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) if !token.trim().is_empty() => token.trim(),
                _ => {
                    warn!("Invalid Authorization header format");
                    return Outcome::Error((Status::Unauthorized, AuthError::InvalidToken));
                }
            },
            None => {
                debug!("Missing Authorization header");
                return Outcome::Error((Status::Unauthorized, AuthError::MissingToken));
            }
        };

        let claims = match auth_config.verify_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Token verification failed: {}", e);
                return Outcome::Error((Status::Unauthorized, AuthError::TokenVerificationFailed));
            }
        };

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            warn!("Token subject is not a user id: {}", claims.sub);
            return Outcome::Error((Status::Unauthorized, AuthError::InvalidToken));
        };

        let user = match UserRepository::new(database.pool()).find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Token for unknown user {}", user_id);
                return Outcome::Error((Status::Unauthorized, AuthError::UnknownUser));
            }
            Err(e) => {
                error!("Failed to load user {}: {}", user_id, e);
                return Outcome::Error((Status::InternalServerError, AuthError::DatabaseError));
            }
        };

        debug!("User {} authenticated", user.email);
        Outcome::Success(AuthenticatedUser { user, claims })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenVerificationFailed,
    UnknownUser,
    DatabaseError,
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<AuthenticatedUser>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuth { user: Some(auth) }),
            _ => Outcome::Success(OptionalAuth { user: None }),
        }
    }
}
