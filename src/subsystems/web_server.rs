use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post, put},
};
use futures::FutureExt;
use sqlx::PgPool;
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    AppState,
    domain::{cart, catalog, order, review, user},
    infra::ClientError,
};

const MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

pub struct WebServer {
    state: AppState,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for WebServer {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        let address = self.state.settings.application.address();
        let socket_addr: SocketAddr = address.parse()
            .inspect_err(|e| error!("Could not parse server address {address}.\nCheck application host and port in configuration settings.\nFailed with {e}"))?;

        let router = router(self.state);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .inspect_err(|e| {
                error!("Could not bind socket address {socket_addr}. Failed with {e}")
            })?;

        info!("Web server starting on http://{socket_addr}");
        select!(
            result = axum::serve(listener, router.into_make_service()).into_future().map(|result| result.map_err(anyhow::Error::new)) => {
                error!("Web server completed with {result:?}");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Web server shutdown");
            }
        );
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.images.directory().as_std_path());

    Router::new()
        // Catalog
        .route("/api/products/latest", get(catalog::latest_products_endpoint))
        .route("/api/products/featured", get(catalog::featured_products_endpoint))
        .route("/api/products/search", get(catalog::search_products_endpoint))
        .route("/api/products/categories", get(catalog::categories_endpoint))
        .route("/api/products/by-slug/{slug}", get(catalog::product_by_slug_endpoint))
        // Reviews
        .route("/api/reviews", post(review::post_review_endpoint))
        .route("/api/reviews/{product_id}", get(review::reviews_endpoint))
        .route("/api/reviews/{product_id}/mine", get(review::my_review_endpoint))
        // Cart
        .route("/api/cart", get(cart::my_cart_endpoint))
        .route("/api/cart/session", post(cart::cart_session_endpoint))
        .route("/api/cart/items", post(cart::add_item_endpoint))
        .route("/api/cart/items/{product_id}/remove", post(cart::remove_item_endpoint))
        // Users
        .route("/api/auth/sign-up", post(user::sign_up_endpoint))
        .route("/api/auth/sign-in", post(user::sign_in_endpoint))
        .route("/api/auth/sign-out", post(user::sign_out_endpoint))
        .route(
            "/api/user/profile",
            get(user::profile_endpoint).put(user::update_profile_endpoint),
        )
        .route("/api/user/address", put(user::update_address_endpoint))
        .route("/api/user/payment-method", put(user::update_payment_method_endpoint))
        // Orders and payments
        .route("/api/orders", post(order::place_order_endpoint))
        .route("/api/orders/mine", get(order::my_orders_endpoint))
        .route("/api/orders/{order_id}", get(order::order_endpoint))
        .route("/api/orders/{order_id}/paypal", post(order::create_paypal_order_endpoint))
        .route(
            "/api/orders/{order_id}/paypal/approve",
            post(order::approve_paypal_order_endpoint),
        )
        .route(
            "/api/orders/{order_id}/stripe-intent",
            post(order::create_payment_intent_endpoint),
        )
        .route("/api/webhooks/stripe", post(order::stripe_webhook_endpoint))
        // Admin
        .route("/api/admin/summary", get(order::orders_summary_endpoint))
        .route("/api/admin/orders", get(order::admin_orders_endpoint))
        .route("/api/admin/orders/{order_id}", delete(order::delete_order_endpoint))
        .route("/api/admin/orders/{order_id}/paid", post(order::mark_paid_endpoint))
        .route("/api/admin/orders/{order_id}/delivered", post(order::deliver_order_endpoint))
        .route(
            "/api/admin/products",
            get(catalog::admin_products_endpoint).post(catalog::create_product_endpoint),
        )
        .route(
            "/api/admin/products/{product_id}",
            get(catalog::admin_product_endpoint)
                .put(catalog::update_product_endpoint)
                .delete(catalog::delete_product_endpoint),
        )
        .route(
            "/api/admin/uploads",
            post(catalog::upload_image_endpoint).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/admin/users", get(user::admin_users_endpoint))
        .route(
            "/api/admin/users/{user_id}",
            get(user::admin_user_endpoint)
                .put(user::update_user_endpoint)
                .delete(user::delete_user_endpoint),
        )
        .route("/healthcheck", get(health_check_endpoint))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check_endpoint(State(pool): State<PgPool>) -> Result<Json<String>, ClientError> {
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(Json("Ok".to_owned()))
}
