//! Remove Item slice

use anyhow::Context;
use axum::extract::{Path, State};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::ProductId,
    infra::{ActionResult, CartContext, ClientError},
};

use super::{Cart, CartError, CartOwner, LineChange, load_cart, save_cart};

//------------------------- Web API ----------------------------

pub async fn remove_item_endpoint(
    State(pool): State<PgPool>,
    context: CartContext,
    Path(product_uuid): Path<Uuid>,
) -> Result<ActionResult<Cart>, ClientError> {
    let product_id: ProductId = product_uuid.try_into()?;
    let (cart, name, change) = remove_item(&pool, &context, product_id).await?;
    let message = match change {
        LineChange::Removed => format!("{name} removed from cart"),
        _ => format!("{name} updated in cart"),
    };
    Ok(ActionResult::with_data(message, cart))
}

//----------------------- Implementation --------------------------

/// Removes one unit of the product. Returns the product's name for the caller's message.
pub async fn remove_item(
    pool: &PgPool,
    context: &CartContext,
    product_id: ProductId,
) -> Result<(Cart, String, LineChange), ClientError> {
    let owner = CartOwner::from_context(context)?;

    let mut tx = pool
        .begin()
        .await
        .context("Problem starting remove item transaction.")?;

    let mut cart = load_cart(&mut tx, owner, true)
        .await?
        .ok_or(CartError::ItemNotFound)?;
    let name = cart
        .item(product_id)
        .map(|item| item.name.clone())
        .ok_or(CartError::ItemNotFound)?;
    let change = cart.remove_item(product_id)?;
    save_cart(&mut tx, &cart).await?;

    tx.commit().await.context("Problem committing remove item.")?;
    Ok((cart, name, change))
}

//-------------------------- Tests -------------------------------
