//! My Cart slice: the caller's cart and the anonymous cart session.

use anyhow::Context;
use axum::{
    Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use crate::{
    domain::SessionCartId,
    infra::{ActionResult, CartContext, ClientError, session::session_cart_cookie},
};

use super::{Cart, CartOwner, load_cart};

//------------------------- Web API ----------------------------

pub async fn my_cart_endpoint(
    State(pool): State<PgPool>,
    context: CartContext,
) -> Result<Json<Option<Cart>>, ClientError> {
    Ok(Json(my_cart(&pool, &context).await?))
}

/// Hands out a cart session id unless the caller already carries one.
pub async fn cart_session_endpoint(context: CartContext) -> Response {
    let session_cart_id = context.session_cart_id.unwrap_or_else(SessionCartId::new);
    (
        [(SET_COOKIE, session_cart_cookie(session_cart_id))],
        ActionResult::with_data("Cart session ready", session_cart_id),
    )
        .into_response()
}

//----------------------- Implementation --------------------------

/// No cart context or no cart yet both mean "no cart".
pub async fn my_cart(pool: &PgPool, context: &CartContext) -> Result<Option<Cart>, anyhow::Error> {
    let Ok(owner) = CartOwner::from_context(context) else {
        return Ok(None);
    };
    let mut conn = pool.acquire().await.context("Problem acquiring connection.")?;
    load_cart(&mut conn, owner, false).await
}

//-------------------------- Tests -------------------------------
