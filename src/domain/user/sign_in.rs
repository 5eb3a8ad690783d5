//! Sign In and Sign Out slices

use anyhow::Context;
use axum::{
    Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    domain::{UserId, cart::merge_session_cart},
    infra::{
        ActionResult, CartContext, ClientError, SessionUser, TokenKeys,
        session::{auth_cookie, expired_auth_cookie},
    },
};

use super::{Role, UserError, model::normalize_email, password::verify_password};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returned by sign in and sign up. The token is also set as a cookie.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    pub user_id: UserId,
    pub role: Role,
    pub token: String,
}

pub async fn sign_in_endpoint(
    State(pool): State<PgPool>,
    State(keys): State<TokenKeys>,
    context: CartContext,
    Json(payload): Json<SignInPayload>,
) -> Result<Response, ClientError> {
    payload.validate()?;
    let user = sign_in(&pool, &context, &payload).await?;
    signed_in_response(&keys, user, "Signed in successfully")
}

pub async fn sign_out_endpoint() -> Response {
    (
        [(SET_COOKIE, expired_auth_cookie())],
        ActionResult::ok("Signed out successfully"),
    )
        .into_response()
}

pub(super) fn signed_in_response(
    keys: &TokenKeys,
    user: SessionUser,
    message: &str,
) -> Result<Response, ClientError> {
    let token = keys.issue(&user)?;
    let cookie = auth_cookie(&token, keys.lifetime_secs());
    let body = SignedIn {
        user_id: user.user_id,
        role: user.role,
        token,
    };
    Ok(([(SET_COOKIE, cookie)], ActionResult::with_data(message, body)).into_response())
}

//----------------------- Implementation --------------------------

#[derive(sqlx::FromRow)]
struct Credentials {
    user_id: UserId,
    role: Role,
    password_hash: String,
}

/// Checks the credentials, then hands the session cart over to the user.
pub async fn sign_in(
    pool: &PgPool,
    context: &CartContext,
    payload: &SignInPayload,
) -> Result<SessionUser, ClientError> {
    let credentials: Option<Credentials> =
        sqlx::query_as("SELECT user_id, role, password_hash FROM users WHERE email = $1")
            .bind(normalize_email(&payload.email))
            .fetch_optional(pool)
            .await
            .context("Problem reading user credentials.")?;

    let credentials = credentials
        .filter(|found| verify_password(&payload.password, &found.password_hash))
        .ok_or(UserError::InvalidCredentials)?;

    if let Some(session_cart_id) = context.session_cart_id {
        let mut tx = pool.begin().await.context("Problem starting sign in transaction.")?;
        merge_session_cart(&mut tx, session_cart_id, credentials.user_id).await?;
        tx.commit().await.context("Problem committing sign in.")?;
    }

    info!("User {} signed in", credentials.user_id);
    Ok(SessionUser {
        user_id: credentials.user_id,
        role: credentials.role,
    })
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{hash_password, insert_user};

    fn payload(email: &str, password: &str) -> SignInPayload {
        SignInPayload {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[sqlx::test]
    async fn correct_credentials_sign_in(pool: PgPool) {
        let hash = hash_password("secret123").expect("Password should hash.");
        let user_id = insert_user(&pool, "Jane", "jane@example.com", &hash, Role::User)
            .await
            .expect("User should be created.");

        let user = sign_in(
            &pool,
            &CartContext::default(),
            &payload("JANE@example.com", "secret123"),
        )
        .await
        .expect("Sign in should succeed.");

        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, Role::User);
    }

    #[sqlx::test]
    async fn wrong_password_and_unknown_email_look_the_same(pool: PgPool) {
        let hash = hash_password("secret123").expect("Password should hash.");
        insert_user(&pool, "Jane", "jane@example.com", &hash, Role::User)
            .await
            .expect("User should be created.");

        let wrong_password = sign_in(
            &pool,
            &CartContext::default(),
            &payload("jane@example.com", "secret124"),
        )
        .await;
        let unknown_email = sign_in(
            &pool,
            &CartContext::default(),
            &payload("john@example.com", "secret123"),
        )
        .await;

        assert!(matches!(
            wrong_password,
            Err(ClientError::User(UserError::InvalidCredentials))
        ));
        assert!(matches!(
            unknown_email,
            Err(ClientError::User(UserError::InvalidCredentials))
        ));
    }

    #[test]
    fn missing_password_is_rejected() {
        let errors = payload("jane@example.com", "")
            .validate()
            .expect_err("Password is required.");
        assert!(errors.field_errors().contains_key("password"));
    }
}
