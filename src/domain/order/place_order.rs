//! Place Order slice
//!
//! Checkout turns the caller's cart into an order. The checks run in a fixed order and the
//! first one that fails decides the outcome: an empty cart, a missing sign-in, a missing
//! shipping address, then a missing payment method.

use anyhow::Context;
use axum::extract::State;
use sqlx::PgPool;
use tracing::info;

use crate::{
    domain::{
        OrderId, UserId,
        cart::{Cart, CartOwner, load_cart, save_cart},
        user::{PaymentMethod, ShippingAddress, User, find_user},
    },
    infra::{ActionResult, CartContext, ClientError},
};

use super::{Order, OrderError, OrderItem, insert_order};

//------------------------- Web API ----------------------------

pub async fn place_order_endpoint(
    State(pool): State<PgPool>,
    context: CartContext,
) -> Result<ActionResult, ClientError> {
    place_order(&pool, &context).await
}

//----------------------- Implementation --------------------------

/// Everything needed to create the order once all checks have passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub cart: Cart,
    pub user_id: UserId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutStep {
    Place(Checkout),
    Redirect {
        message: &'static str,
        to: &'static str,
    },
}

/// `user` is `Unauthenticated` for anonymous callers and `UserNotFound` when the signed-in
/// user no longer exists.
pub fn plan_checkout(
    cart: Option<Cart>,
    user: Result<User, OrderError>,
) -> Result<CheckoutStep, OrderError> {
    let Some(cart) = cart.filter(|cart| !cart.is_empty()) else {
        return Ok(CheckoutStep::Redirect {
            message: "Your cart is empty.",
            to: "/",
        });
    };
    let user = user?;
    let Some(shipping_address) = user.address else {
        return Ok(CheckoutStep::Redirect {
            message: "No shipping address.",
            to: "/shipping-address",
        });
    };
    let Some(payment_method) = user.payment_method else {
        return Ok(CheckoutStep::Redirect {
            message: "No payment method.",
            to: "/payment-method",
        });
    };
    Ok(CheckoutStep::Place(Checkout {
        cart,
        user_id: user.user_id,
        shipping_address,
        payment_method,
    }))
}

impl Order {
    pub fn from_checkout(checkout: &Checkout, created_at: jiff::Timestamp) -> Self {
        Order {
            order_id: OrderId::new(),
            user_id: checkout.user_id,
            shipping_address: checkout.shipping_address.clone(),
            payment_method: checkout.payment_method,
            payment_result: None,
            prices: checkout.cart.prices,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at,
            items: checkout.cart.items.iter().map(OrderItem::from).collect(),
        }
    }
}

/// Creates the order and its lines and empties the cart, all in one transaction.
pub async fn place_order(pool: &PgPool, context: &CartContext) -> Result<ActionResult, ClientError> {
    let mut tx = pool.begin().await.context("Problem starting checkout transaction.")?;

    let cart = match CartOwner::from_context(context) {
        Ok(owner) => load_cart(&mut tx, owner, true).await?,
        Err(_) => None,
    };
    let user = match context.user_id() {
        Some(user_id) => find_user(pool, user_id)
            .await?
            .ok_or(OrderError::UserNotFound),
        None => Err(OrderError::Unauthenticated),
    };

    let mut checkout = match plan_checkout(cart, user)? {
        CheckoutStep::Place(checkout) => checkout,
        CheckoutStep::Redirect { message, to } => {
            return Ok(ActionResult::redirect(false, message, to));
        }
    };

    let order = Order::from_checkout(&checkout, jiff::Timestamp::now());
    insert_order(&mut tx, &order).await?;
    checkout.cart.clear();
    save_cart(&mut tx, &checkout.cart).await?;

    tx.commit().await.context("Problem committing checkout.")?;

    info!("Order {} placed by {}", order.order_id, order.user_id);
    Ok(ActionResult::redirect(
        true,
        "Order created.",
        format!("/order/{}", order.order_id),
    ))
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use fake::{Fake, Faker};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{
        catalog::{Product, ProductInput, create_product},
        fake::InStock,
        order::find_order,
        pricing::Prices,
        user::{Role, insert_user, update_address, update_payment_method},
    };

    fn address() -> ShippingAddress {
        ShippingAddress {
            address_title: "Home".to_owned(),
            full_name: "Jane Doe".to_owned(),
            street_address: "123 Main St".to_owned(),
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "USA".to_owned(),
        }
    }

    fn user(address: Option<ShippingAddress>, payment_method: Option<PaymentMethod>) -> User {
        User {
            user_id: UserId::new(),
            name: "Jane".to_owned(),
            email: "jane@example.com".to_owned(),
            role: Role::User,
            address,
            payment_method,
            created_at: jiff::Timestamp::now(),
        }
    }

    fn cart_with_one_item() -> Cart {
        let mut cart = Cart::new(CartOwner::User(UserId::new()));
        let mut product: Product = Faker.fake();
        product.stock = 5;
        cart.add_item(&product).expect("Product is in stock.");
        cart
    }

    fn redirect_target(step: CheckoutStep) -> Option<&'static str> {
        match step {
            CheckoutStep::Redirect { to, .. } => Some(to),
            CheckoutStep::Place(_) => None,
        }
    }

    #[test]
    fn an_empty_cart_is_checked_before_sign_in() {
        let step = plan_checkout(None, Err(OrderError::Unauthenticated))
            .expect("Empty cart redirects.");
        assert_eq!(redirect_target(step), Some("/"));

        let empty = Cart::new(CartOwner::Session(crate::domain::SessionCartId::new()));
        let step = plan_checkout(Some(empty), Err(OrderError::Unauthenticated))
            .expect("Empty cart redirects.");
        assert_eq!(redirect_target(step), Some("/"));
    }

    #[test]
    fn anonymous_callers_cannot_check_out() {
        let result = plan_checkout(Some(cart_with_one_item()), Err(OrderError::Unauthenticated));
        assert_eq!(result, Err(OrderError::Unauthenticated));
    }

    #[test]
    fn missing_checkout_details_redirect_to_their_forms() {
        let step = plan_checkout(Some(cart_with_one_item()), Ok(user(None, None)))
            .expect("Should redirect.");
        assert_eq!(redirect_target(step), Some("/shipping-address"));

        let step = plan_checkout(Some(cart_with_one_item()), Ok(user(Some(address()), None)))
            .expect("Should redirect.");
        assert_eq!(redirect_target(step), Some("/payment-method"));

        let step = plan_checkout(
            Some(cart_with_one_item()),
            Ok(user(Some(address()), Some(PaymentMethod::PayPal))),
        )
        .expect("Should place.");
        assert_eq!(redirect_target(step), None);
    }

    #[sqlx::test]
    async fn placing_an_order_snapshots_and_empties_the_cart(pool: PgPool) {
        let user_id = insert_user(&pool, "Jane", "jane@example.com", "hash", Role::User)
            .await
            .expect("User should be created.");
        update_address(&pool, user_id, &address())
            .await
            .expect("Address should be saved.");
        update_payment_method(&pool, user_id, PaymentMethod::Stripe)
            .await
            .expect("Payment method should be saved.");

        let shirt = create_product(
            &pool,
            ProductInput {
                price: dec!(30.00),
                ..InStock(5).fake()
            },
        )
        .await
        .expect("Product should be created.");
        let hat = create_product(
            &pool,
            ProductInput {
                price: dec!(25.00),
                ..InStock(5).fake()
            },
        )
        .await
        .expect("Product should be created.");

        let context = CartContext {
            session_cart_id: None,
            user: Some(crate::infra::SessionUser {
                user_id,
                role: Role::User,
            }),
        };
        for product_id in [shirt.product_id, shirt.product_id, hat.product_id] {
            crate::domain::cart::add_item(&pool, &context, product_id)
                .await
                .expect("Item should be added.");
        }

        let result = place_order(&pool, &context).await.expect("Order should be placed.");
        assert!(result.success);
        let order_id: OrderId = result
            .redirect_to
            .as_deref()
            .and_then(|to| to.strip_prefix("/order/"))
            .and_then(|id| id.parse().ok())
            .expect("Should redirect to the new order.");

        let mut conn = pool.acquire().await.expect("Connection should be acquired.");
        let order = find_order(&mut conn, order_id, false)
            .await
            .expect("Query should succeed.")
            .expect("Order should exist.");
        assert_eq!(order.prices.items_price, dec!(85.00));
        assert_eq!(order.prices.shipping_price, dec!(10.00));
        assert_eq!(order.prices.tax_price, dec!(12.75));
        assert_eq!(order.prices.total_price, dec!(107.75));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_id, shirt.product_id);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.shipping_address, address());
        assert!(!order.is_paid);

        let cart = load_cart(&mut conn, CartOwner::User(user_id), false)
            .await
            .expect("Query should succeed.")
            .expect("Cart should still exist.");
        assert!(cart.is_empty());
        assert_eq!(cart.prices, Prices::zero());
    }

    #[sqlx::test]
    async fn checkout_without_a_cart_redirects_home(pool: PgPool) {
        let context = CartContext {
            session_cart_id: Some(crate::domain::SessionCartId::new()),
            user: None,
        };

        let result = place_order(&pool, &context).await.expect("Should redirect.");
        assert!(!result.success);
        assert_eq!(result.message, "Your cart is empty.");
        assert_eq!(result.redirect_to.as_deref(), Some("/"));
    }
}
