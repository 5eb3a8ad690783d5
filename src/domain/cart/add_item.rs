//! Add Item slice

use anyhow::Context;
use axum::{Json, extract::State};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::{ProductId, catalog::find_product},
    infra::{ActionResult, CartContext, ClientError},
};

use super::{Cart, CartError, CartOwner, LineChange, open_cart, save_cart};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    pub product_id: Uuid,
}

pub async fn add_item_endpoint(
    State(pool): State<PgPool>,
    context: CartContext,
    Json(payload): Json<AddItemPayload>,
) -> Result<ActionResult<Cart>, ClientError> {
    let product_id: ProductId = payload.product_id.try_into()?;
    let (cart, change) = add_item(&pool, &context, product_id).await?;
    let name = cart
        .item(product_id)
        .map(|item| item.name.clone())
        .unwrap_or_default();
    let message = match change {
        LineChange::Added => format!("{name} added to cart"),
        _ => format!("{name} updated in cart"),
    };
    Ok(ActionResult::with_data(message, cart))
}

//----------------------- Implementation --------------------------

/// Adds one unit of the product to the caller's cart, creating the cart on first use.
pub async fn add_item(
    pool: &PgPool,
    context: &CartContext,
    product_id: ProductId,
) -> Result<(Cart, LineChange), ClientError> {
    let owner = CartOwner::from_context(context)?;

    let mut tx = pool.begin().await.context("Problem starting add item transaction.")?;

    let product = find_product(&mut *tx, product_id)
        .await?
        .ok_or(CartError::ProductNotFound(product_id))?;

    let mut cart = open_cart(&mut tx, owner).await?;
    let change = cart.add_item(&product)?;
    save_cart(&mut tx, &cart).await?;

    tx.commit().await.context("Problem committing add item.")?;
    Ok((cart, change))
}

//-------------------------- Tests -------------------------------
