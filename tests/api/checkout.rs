use axum::http::StatusCode;
use fake::Fake;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use storefront::domain::{
    catalog::{ProductInput, create_product, find_product},
    fake::InStock,
    user::{Role, hash_password, insert_user},
};

use crate::test_utils::{assert_until_eq, base_url, start_test_server};

fn address() -> Value {
    json!({
        "addressTitle": "Home",
        "fullName": "Jane Buyer",
        "streetAddress": "123 Main St",
        "city": "Springfield",
        "postalCode": "12345",
        "country": "USA"
    })
}

/// A guest fills a cart, signs up, checks out with cash on delivery and an admin
/// confirms payment and delivery.
#[sqlx::test]
#[serial]
async fn a_guest_cart_becomes_a_paid_and_delivered_order(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options).await;
    let pool = app_state.pool.clone();

    let shirt = create_product(&pool, ProductInput { price: dec!(30.00), ..InStock(5).fake() })
        .await
        .expect("Product should be created.");
    let tie = create_product(&pool, ProductInput { price: dec!(25.00), ..InStock(5).fake() })
        .await
        .expect("Product should be created.");

    let shopper =
        httpc_test::new_client(base_url(&app_state)).expect("Expected client to be created.");
    let res = shopper
        .do_post("/api/cart/session", json!({}))
        .await
        .expect("Cart session should be issued.");
    assert_eq!(res.status(), StatusCode::OK);

    for product in [&shirt, &shirt, &tie] {
        let res = shopper
            .do_post("/api/cart/items", json!({ "productId": product.product_id }))
            .await
            .expect("Add item request should complete.");
        assert_eq!(res.status(), StatusCode::OK);
    }

    let cart = shopper
        .do_get("/api/cart")
        .await
        .expect("Cart should be returned.")
        .json_body()
        .expect("Cart should be JSON.");
    assert_eq!(cart["itemsPrice"], "85.00");
    assert_eq!(cart["shippingPrice"], "10.00");
    assert_eq!(cart["taxPrice"], "12.75");
    assert_eq!(cart["totalPrice"], "107.75");

    let res = shopper
        .do_post("/api/orders", json!({}))
        .await
        .expect("Place order request should complete.");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = shopper
        .do_post(
            "/api/auth/sign-up",
            json!({
                "name": "Jane Buyer",
                "email": "jane@example.com",
                "password": "secret1",
                "confirmPassword": "secret1"
            }),
        )
        .await
        .expect("Sign up request should complete.");
    assert_eq!(res.status(), StatusCode::OK);

    let body = shopper
        .do_post("/api/orders", json!({}))
        .await
        .expect("Place order request should complete.")
        .json_body()
        .expect("Result should be JSON.");
    assert_eq!(body["redirectTo"], "/shipping-address");

    shopper
        .do_put("/api/user/address", address())
        .await
        .expect("Address should be saved.");
    shopper
        .do_put("/api/user/payment-method", json!({ "type": "CashOnDelivery" }))
        .await
        .expect("Payment method should be saved.");

    let body = shopper
        .do_post("/api/orders", json!({}))
        .await
        .expect("Place order request should complete.")
        .json_body()
        .expect("Result should be JSON.");
    assert_eq!(body["success"], true);
    let order_path = body["redirectTo"]
        .as_str()
        .expect("Order should be created.")
        .to_owned();
    let order_id = order_path
        .strip_prefix("/order/")
        .expect("Redirect should point at the order.")
        .to_owned();

    let cart = shopper
        .do_get("/api/cart")
        .await
        .expect("Cart should be returned.")
        .json_body()
        .expect("Cart should be JSON.");
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["totalPrice"], "0.00");

    // Only admins confirm cash payments.
    let res = shopper
        .do_post(&format!("/api/admin/orders/{order_id}/paid"), json!({}))
        .await
        .expect("Mark paid request should complete.");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let password_hash = hash_password("123456").expect("Password should hash.");
    insert_user(&pool, "Admin", "admin@example.com", &password_hash, Role::Admin)
        .await
        .expect("Admin should be created.");
    let admin =
        httpc_test::new_client(base_url(&app_state)).expect("Expected client to be created.");
    let res = admin
        .do_post(
            "/api/auth/sign-in",
            json!({ "email": "admin@example.com", "password": "123456" }),
        )
        .await
        .expect("Sign in request should complete.");
    assert_eq!(res.status(), StatusCode::OK);

    let res = admin
        .do_post(&format!("/api/admin/orders/{order_id}/delivered"), json!({}))
        .await
        .expect("Deliver request should complete.");
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = admin
        .do_post(&format!("/api/admin/orders/{order_id}/paid"), json!({}))
        .await
        .expect("Mark paid request should complete.");
    assert_eq!(res.status(), StatusCode::OK);

    let res = admin
        .do_post(&format!("/api/admin/orders/{order_id}/paid"), json!({}))
        .await
        .expect("Mark paid request should complete.");
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let shirt_stock = find_product(&pool, shirt.product_id)
        .await
        .expect("Query should succeed.")
        .expect("Product should exist.")
        .stock;
    assert_eq!(shirt_stock, 3);

    let res = admin
        .do_post(&format!("/api/admin/orders/{order_id}/delivered"), json!({}))
        .await
        .expect("Deliver request should complete.");
    assert_eq!(res.status(), StatusCode::OK);

    let order = shopper
        .do_get(&format!("/api/orders/{order_id}"))
        .await
        .expect("Order should be returned.")
        .json_body()
        .expect("Order should be JSON.");
    assert_eq!(order["isPaid"], true);
    assert_eq!(order["isDelivered"], true);
    assert_eq!(order["totalPrice"], "107.75");
    assert_eq!(order["user"]["email"], "jane@example.com");

    // The receipt task is picked up and completed by the work queue.
    assert_until_eq(
        || async {
            sqlx::query_scalar::<_, i64>("SELECT count(*) FROM queue")
                .fetch_one(&pool)
                .await
        },
        0,
        "Waiting for the purchase receipt to be sent.",
    )
    .await;

    app_state.pool.close().await;
}

#[sqlx::test]
#[serial]
async fn orders_are_private_to_their_buyer(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options).await;

    let stranger =
        httpc_test::new_client(base_url(&app_state)).expect("Expected client to be created.");
    let res = stranger
        .do_get("/api/orders/mine")
        .await
        .expect("Request should complete.");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = stranger
        .do_get("/api/admin/summary")
        .await
        .expect("Request should complete.");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    app_state.pool.close().await;
}
