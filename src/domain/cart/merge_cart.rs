//! Merge-on-login: the anonymous session's cart replaces whatever cart the user had.

use anyhow::Context;
use sqlx::PgConnection;
use tracing::info;

use crate::domain::{CartId, SessionCartId, UserId};

/// Runs inside the sign-in transaction. Does nothing when the session has no cart.
pub async fn merge_session_cart(
    conn: &mut PgConnection,
    session_cart_id: SessionCartId,
    user_id: UserId,
) -> Result<bool, anyhow::Error> {
    let session_cart: Option<CartId> =
        sqlx::query_scalar("SELECT cart_id FROM carts WHERE session_cart_id = $1 FOR UPDATE")
            .bind(session_cart_id)
            .fetch_optional(&mut *conn)
            .await
            .with_context(|| format!("Problem reading session cart {session_cart_id}."))?;
    let Some(cart_id) = session_cart else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM carts WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Problem discarding previous cart of user {user_id}."))?;

    sqlx::query(
        "UPDATE carts SET user_id = $2, session_cart_id = NULL, updated_at = now()
         WHERE cart_id = $1",
    )
    .bind(cart_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Problem assigning cart {cart_id} to user {user_id}."))?;

    info!("Cart {cart_id} merged into user {user_id}");
    Ok(true)
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use fake::Fake;
    use sqlx::PgPool;

    use super::*;
    use crate::{
        domain::{
            cart::{CartOwner, add_item, load_cart},
            catalog::create_product,
            fake::InStock,
            user::{Role, insert_user},
        },
        infra::{CartContext, SessionUser},
    };

    #[sqlx::test]
    async fn session_cart_replaces_the_users_previous_cart(pool: PgPool) {
        let user_id = insert_user(&pool, "Jane", "jane@example.com", "hash", Role::User)
            .await
            .expect("User should be created.");
        let old = create_product(&pool, InStock(5).fake())
            .await
            .expect("Product should be created.");
        let new = create_product(&pool, InStock(5).fake())
            .await
            .expect("Product should be created.");

        let user_context = CartContext {
            session_cart_id: None,
            user: Some(SessionUser {
                user_id,
                role: Role::User,
            }),
        };
        add_item(&pool, &user_context, old.product_id)
            .await
            .expect("Item should be added to the user cart.");

        let session_cart_id = SessionCartId::new();
        let session_context = CartContext {
            session_cart_id: Some(session_cart_id),
            user: None,
        };
        let (session_cart, _) = add_item(&pool, &session_context, new.product_id)
            .await
            .expect("Item should be added to the session cart.");

        let mut tx = pool.begin().await.expect("Transaction should start.");
        let merged = merge_session_cart(&mut tx, session_cart_id, user_id)
            .await
            .expect("Carts should merge.");
        tx.commit().await.expect("Transaction should commit.");
        assert!(merged);

        let mut conn = pool.acquire().await.expect("Connection should be acquired.");
        let cart = load_cart(&mut conn, CartOwner::User(user_id), false)
            .await
            .expect("Cart should load.")
            .expect("User should own a cart.");
        assert_eq!(cart.cart_id, session_cart.cart_id);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, new.product_id);

        let leftover = load_cart(&mut conn, CartOwner::Session(session_cart_id), false)
            .await
            .expect("Query should succeed.");
        assert_eq!(leftover, None);
    }

    #[sqlx::test]
    async fn sessions_without_a_cart_leave_the_user_cart_alone(pool: PgPool) {
        let user_id = insert_user(&pool, "Jo", "jo@example.com", "hash", Role::User)
            .await
            .expect("User should be created.");

        let mut conn = pool.acquire().await.expect("Connection should be acquired.");
        let merged = merge_session_cart(&mut conn, SessionCartId::new(), user_id)
            .await
            .expect("Merge should succeed.");
        assert!(!merged);
    }
}
