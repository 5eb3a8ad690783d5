use axum::http::StatusCode;
use fake::Fake;
use hmac::{Hmac, Mac};
use rust_decimal_macros::dec;
use serde_json::json;
use serial_test::serial;
use sha2::Sha256;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use storefront::{
    AppState,
    domain::{
        OrderId,
        cart::add_item,
        catalog::{ProductInput, create_product},
        fake::InStock,
        order::{SIGNATURE_HEADER, place_order},
        user::{PaymentMethod, Role, ShippingAddress, insert_user, update_address, update_payment_method},
    },
    infra::{CartContext, SessionUser},
};

use crate::test_utils::{WEBHOOK_SECRET, base_url, start_test_server};

/// An order of one product at 20.00, paid by card: 33.00 in total.
async fn stripe_order(pool: &PgPool) -> OrderId {
    let user_id = insert_user(pool, "Card Payer", "card@example.com", "hash", Role::User)
        .await
        .expect("User should be created.");
    update_address(
        pool,
        user_id,
        &ShippingAddress {
            address_title: "Home".to_owned(),
            full_name: "Card Payer".to_owned(),
            street_address: "1 Card Lane".to_owned(),
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "USA".to_owned(),
        },
    )
    .await
    .expect("Address should be saved.");
    update_payment_method(pool, user_id, PaymentMethod::Stripe)
        .await
        .expect("Payment method should be saved.");

    let product = create_product(pool, ProductInput { price: dec!(20.00), ..InStock(3).fake() })
        .await
        .expect("Product should be created.");
    let context = CartContext {
        session_cart_id: None,
        user: Some(SessionUser { user_id, role: Role::User }),
    };
    add_item(pool, &context, product.product_id)
        .await
        .expect("Item should be added.");
    place_order(pool, &context).await.expect("Order should be placed.");

    sqlx::query_scalar("SELECT order_id FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Order should exist.")
}

fn signature(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes())
        .expect("Any key length is accepted.");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

async fn post_webhook(app_state: &AppState, payload: &str, signature: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/webhooks/stripe", base_url(app_state)))
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(payload.to_owned())
        .send()
        .await
        .expect("Webhook request should complete.")
}

async fn is_paid(pool: &PgPool, order_id: OrderId) -> bool {
    sqlx::query_scalar("SELECT is_paid FROM orders WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .expect("Order should exist.")
}

#[sqlx::test]
#[serial]
async fn signed_charge_events_pay_the_order(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options).await;
    let order_id = stripe_order(&app_state.pool).await;

    let payload = json!({
        "type": "charge.succeeded",
        "data": { "object": {
            "id": "ch_integration",
            "amount": 3300,
            "metadata": { "orderId": order_id },
            "billing_details": { "email": "card@example.com" }
        }}
    })
    .to_string();

    let forged = post_webhook(&app_state, &payload, "t=1,v1=deadbeef").await;
    assert_eq!(forged.status(), StatusCode::BAD_REQUEST);
    assert!(!is_paid(&app_state.pool, order_id).await);

    let now = jiff::Timestamp::now().as_second();
    let res = post_webhook(&app_state, &payload, &signature(&payload, now)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(is_paid(&app_state.pool, order_id).await);

    let price_paid: String = sqlx::query_scalar(
        "SELECT payment_result ->> 'pricePaid' FROM orders WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&app_state.pool)
    .await
    .expect("Payment result should be stored.");
    assert_eq!(price_paid, "33.00");

    app_state.pool.close().await;
}
