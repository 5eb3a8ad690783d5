//! Request identity.
//!
//! Every storefront operation receives an explicit [`CartContext`]: the anonymous cart session
//! (header or cookie) and the signed-in user decoded from a bearer token or the auth cookie.

use anyhow::Context;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use crate::{
    domain::{SessionCartId, UserId, user::Role},
    infra::{AuthSettings, ClientError},
};

pub const SESSION_CART_HEADER: &str = "x-session-cart-id";
pub const SESSION_CART_COOKIE: &str = "sessionCartId";
pub const AUTH_COOKIE: &str = "authToken";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: UserId,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl TokenKeys {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime_secs: i64::from(settings.token_lifetime_days) * 24 * 3600,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn issue(&self, user: &SessionUser) -> Result<String, anyhow::Error> {
        let now = jiff::Timestamp::now().as_second();
        let claims = Claims {
            sub: user.user_id,
            role: user.role,
            iat: now,
            exp: now + self.lifetime_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .with_context(|| format!("Could not sign session token for user {}.", user.user_id))
    }

    pub fn verify(&self, token: &str) -> Result<SessionUser, ClientError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!("Rejected session token: {e}");
                ClientError::Unauthenticated
            })?;
        Ok(SessionUser {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// The signed-in user as carried by the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: UserId,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Who a cart belongs to for the current request. Either part may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartContext {
    pub session_cart_id: Option<SessionCartId>,
    pub user: Option<SessionUser>,
}

impl CartContext {
    pub fn user_id(&self) -> Option<UserId> {
        self.user.map(|user| user.user_id)
    }
}

/// A request that must come from a signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub SessionUser);

/// A request that must come from an admin.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub SessionUser);

impl<S> FromRequestParts<S> for CartContext
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = ClientError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);

        let session_cart_id = parts
            .headers
            .get(SESSION_CART_HEADER)
            .and_then(|value| value.to_str().ok())
            .or_else(|| cookie(parts, SESSION_CART_COOKIE))
            .and_then(|raw| match raw.parse::<SessionCartId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    debug!("Ignoring session cart id {raw}: {e}");
                    None
                }
            });

        let user = session_token(parts).and_then(|token| keys.verify(token).ok());

        Ok(CartContext {
            session_cart_id,
            user,
        })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = ClientError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);
        let token = session_token(parts).ok_or(ClientError::Unauthenticated)?;
        keys.verify(token).map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = ClientError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ClientError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

fn session_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| cookie(parts, AUTH_COOKIE))
}

fn cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn session_cart_cookie(session_cart_id: SessionCartId) -> String {
    format!("{SESSION_CART_COOKIE}={session_cart_id}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn auth_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn expired_auth_cookie() -> String {
    format!("{AUTH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

//-------------------------- Tests -------------------------------
