//! Sign Up slice

use anyhow::Context;
use axum::{Json, extract::State, response::Response};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    domain::cart::merge_session_cart,
    infra::{CartContext, ClientError, SessionUser, TokenKeys},
};

use super::{Role, model::insert_user, password::hash_password, sign_in::signed_in_response};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    #[validate(length(min = 2, message = "Name must be at least two characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least six characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match!"))]
    pub confirm_password: String,
}

pub async fn sign_up_endpoint(
    State(pool): State<PgPool>,
    State(keys): State<TokenKeys>,
    context: CartContext,
    Json(payload): Json<SignUpPayload>,
) -> Result<Response, ClientError> {
    payload.validate()?;
    let user = sign_up(&pool, &context, &payload).await?;
    signed_in_response(&keys, user, "User registered successfully")
}

//----------------------- Implementation --------------------------

/// Registers a regular user and signs them in, taking over the session cart.
pub async fn sign_up(
    pool: &PgPool,
    context: &CartContext,
    payload: &SignUpPayload,
) -> Result<SessionUser, ClientError> {
    let password_hash = hash_password(&payload.password)?;

    let mut tx = pool.begin().await.context("Problem starting sign up transaction.")?;
    let user_id = insert_user(
        &mut *tx,
        payload.name.trim(),
        &payload.email,
        &password_hash,
        Role::User,
    )
    .await?;
    if let Some(session_cart_id) = context.session_cart_id {
        merge_session_cart(&mut tx, session_cart_id, user_id).await?;
    }
    tx.commit().await.context("Problem committing sign up.")?;

    info!("User {user_id} registered");
    Ok(SessionUser {
        user_id,
        role: Role::User,
    })
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use fake::Fake;

    use super::*;
    use crate::domain::{
        SessionCartId,
        cart::{add_item, my_cart},
        catalog::create_product,
        fake::InStock,
    };

    fn payload(email: &str) -> SignUpPayload {
        SignUpPayload {
            name: "Jane Doe".to_owned(),
            email: email.to_owned(),
            password: "secret123".to_owned(),
            confirm_password: "secret123".to_owned(),
        }
    }

    #[test]
    fn passwords_must_match() {
        let mismatched = SignUpPayload {
            confirm_password: "secret124".to_owned(),
            ..payload("jane@example.com")
        };

        let errors = mismatched.validate().expect_err("Passwords differ.");
        assert_eq!(
            crate::infra::first_validation_message(&errors),
            "Passwords don't match!"
        );
    }

    #[sqlx::test]
    async fn duplicate_emails_are_reported(pool: PgPool) {
        sign_up(&pool, &CartContext::default(), &payload("jane@example.com"))
            .await
            .expect("First sign up should succeed.");

        let err = sign_up(&pool, &CartContext::default(), &payload("Jane@Example.com"))
            .await
            .expect_err("Email is taken.");

        let response = axum::response::IntoResponse::into_response(err);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn the_session_cart_follows_the_new_user(pool: PgPool) {
        let product = create_product(&pool, InStock(2).fake())
            .await
            .expect("Product should be created.");
        let anonymous = CartContext {
            session_cart_id: Some(SessionCartId::new()),
            user: None,
        };
        let (session_cart, _) = add_item(&pool, &anonymous, product.product_id)
            .await
            .expect("Item should be added.");

        let user = sign_up(&pool, &anonymous, &payload("jane@example.com"))
            .await
            .expect("Sign up should succeed.");

        let signed_in = CartContext {
            session_cart_id: None,
            user: Some(user),
        };
        let cart = my_cart(&pool, &signed_in)
            .await
            .expect("Query should succeed.")
            .expect("User should own the session cart.");
        assert_eq!(cart.cart_id, session_cart.cart_id);
    }
}
