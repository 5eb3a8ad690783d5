//! Profile slices: the signed-in user's name, saved shipping address and payment method.

use anyhow::Context;
use axum::{Json, extract::State};
use sqlx::{PgPool, types::Json as JsonColumn};
use validator::Validate;

use crate::{
    domain::UserId,
    infra::{ActionResult, AuthUser, ClientError},
};

use super::{PaymentMethod, ShippingAddress, User, UserError, model::find_user};

//------------------------- Web API ----------------------------

pub async fn profile_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
) -> Result<Json<User>, ClientError> {
    Ok(Json(profile(&pool, user.user_id).await?))
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, message = "Name must be at least two characters"))]
    pub name: String,
}

pub async fn update_profile_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<ActionResult, ClientError> {
    payload.validate()?;
    update_profile(&pool, user.user_id, payload.name.trim()).await?;
    Ok(ActionResult::ok("User updated successfully."))
}

pub async fn update_address_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Json(address): Json<ShippingAddress>,
) -> Result<ActionResult, ClientError> {
    address.validate()?;
    update_address(&pool, user.user_id, &address).await?;
    Ok(ActionResult::ok("Address updated successfully"))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaymentMethodPayload {
    #[serde(rename = "type")]
    pub method: PaymentMethod,
}

pub async fn update_payment_method_endpoint(
    AuthUser(user): AuthUser,
    State(pool): State<PgPool>,
    Json(payload): Json<PaymentMethodPayload>,
) -> Result<ActionResult, ClientError> {
    update_payment_method(&pool, user.user_id, payload.method).await?;
    Ok(ActionResult::ok("Payment method updated"))
}

//----------------------- Implementation --------------------------

pub async fn profile(pool: &PgPool, user_id: UserId) -> Result<User, ClientError> {
    let user = find_user(pool, user_id)
        .await?
        .ok_or(UserError::UserNotFound)?;
    Ok(user)
}

pub async fn update_profile(pool: &PgPool, user_id: UserId, name: &str) -> Result<(), ClientError> {
    let result = sqlx::query("UPDATE users SET name = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await
        .with_context(|| format!("Problem updating name of user {user_id}."))?;
    found_or_not(result.rows_affected())
}

pub async fn update_address(
    pool: &PgPool,
    user_id: UserId,
    address: &ShippingAddress,
) -> Result<(), ClientError> {
    let result = sqlx::query("UPDATE users SET address = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(JsonColumn(address))
        .execute(pool)
        .await
        .with_context(|| format!("Problem updating address of user {user_id}."))?;
    found_or_not(result.rows_affected())
}

pub async fn update_payment_method(
    pool: &PgPool,
    user_id: UserId,
    method: PaymentMethod,
) -> Result<(), ClientError> {
    let result = sqlx::query("UPDATE users SET payment_method = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(method)
        .execute(pool)
        .await
        .with_context(|| format!("Problem updating payment method of user {user_id}."))?;
    found_or_not(result.rows_affected())
}

fn found_or_not(rows_affected: u64) -> Result<(), ClientError> {
    if rows_affected == 0 {
        return Err(UserError::UserNotFound.into());
    }
    Ok(())
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{Role, insert_user};

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

    #[sqlx::test]
    async fn checkout_details_are_saved_on_the_profile(pool: PgPool) {
        let user_id = insert_user(&pool, "Jane", "jane@example.com", "hash", Role::User)
            .await
            .expect("User should be created.");

        update_profile(&pool, user_id, "Jane Doe")
            .await
            .expect("Name should update.");
        update_address(&pool, user_id, &address())
            .await
            .expect("Address should update.");
        update_payment_method(&pool, user_id, PaymentMethod::Stripe)
            .await
            .expect("Payment method should update.");

        let user = profile(&pool, user_id).await.expect("Profile should load.");
        assert_eq!(user.name, "Jane Doe");
        assert_eq!(user.address, Some(address()));
        assert_eq!(user.payment_method, Some(PaymentMethod::Stripe));
    }

    #[sqlx::test]
    async fn unknown_users_have_no_profile(pool: PgPool) {
        let result = update_profile(&pool, UserId::new(), "Ghost").await;
        assert!(matches!(result, Err(ClientError::User(UserError::UserNotFound))));
    }

    #[test]
    fn payment_method_payload_uses_the_type_key() {
        let payload: PaymentMethodPayload =
            serde_json::from_str(r#"{"type":"PayPal"}"#).expect("Payload should parse.");
        assert_eq!(payload.method, PaymentMethod::PayPal);
    }
}
