use anyhow::Context;
use sqlx::{PgExecutor, PgPool, types::Json};
use strum_macros::Display;
use validator::Validate;

use crate::domain::UserId;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    PayPal,
    Stripe,
    CashOnDelivery,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub address_title: String,
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub full_name: String,
    #[validate(length(min = 3, message = "Address must be at least 3 characters"))]
    pub street_address: String,
    #[validate(length(min = 3, message = "City must be at least 3 characters"))]
    pub city: String,
    #[validate(length(min = 3, message = "Postal code must be at least 3 characters"))]
    pub postal_code: String,
    #[validate(length(min = 3, message = "Country must be at least 3 characters"))]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    user_id: UserId,
    name: String,
    email: String,
    role: Role,
    address: Option<Json<ShippingAddress>>,
    payment_method: Option<PaymentMethod>,
    created_at: jiff_sqlx::Timestamp,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            role: row.role,
            address: row.address.map(|address| address.0),
            payment_method: row.payment_method,
            created_at: row.created_at.to_jiff(),
        }
    }
}

pub async fn find_user(pool: &PgPool, user_id: UserId) -> Result<Option<User>, anyhow::Error> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT user_id, name, email, role, address, payment_method, created_at
         FROM users WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Problem reading user {user_id}."))?;
    Ok(row.map(Into::into))
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn insert_user<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<UserId, anyhow::Error> {
    let user_id = UserId::new();
    sqlx::query(
        "INSERT INTO users (user_id, name, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(name)
    .bind(normalize_email(email))
    .bind(password_hash)
    .bind(role)
    .execute(executor)
    .await
    .with_context(|| format!("Problem inserting user {email}."))?;
    Ok(user_id)
}
