//! Back-office user management.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        UserId,
        helpers::pagination::{PageQuery, Paginated, offset, total_pages},
    },
    infra::{ActionResult, AdminUser, ClientError, Settings},
};

use super::{
    Role, User, UserError,
    model::{UserRow, find_user},
};

//------------------------- Web API ----------------------------

pub async fn admin_users_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    State(settings): State<Settings>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<User>>, ClientError> {
    let users = list_users(
        &pool,
        query.query(),
        query.page(),
        settings.application.pagination_size,
    )
    .await?;
    Ok(Json(users))
}

pub async fn admin_user_endpoint(
    _admin: AdminUser,
    State(pool): State<PgPool>,
    Path(user_uuid): Path<Uuid>,
) -> Result<Json<User>, ClientError> {
    let user_id: UserId = user_uuid.try_into()?;
    let user = find_user(&pool, user_id)
        .await?
        .ok_or(UserError::UserNotFound)?;
    Ok(Json(user))
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, message = "Name must be at least two characters"))]
    pub name: String,
    pub role: Role,
}

pub async fn update_user_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Path(user_uuid): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<ActionResult, ClientError> {
    let user_id: UserId = user_uuid.try_into()?;
    payload.validate()?;
    update_user(&pool, user_id, payload.name.trim(), payload.role).await?;
    info!("User {user_id} set to {} by {}", payload.role, admin.user_id);
    Ok(ActionResult::ok("User updated successfully"))
}

pub async fn delete_user_endpoint(
    AdminUser(admin): AdminUser,
    State(pool): State<PgPool>,
    Path(user_uuid): Path<Uuid>,
) -> Result<ActionResult, ClientError> {
    let user_id: UserId = user_uuid.try_into()?;
    delete_user(&pool, user_id).await?;
    info!("User {user_id} deleted by {}", admin.user_id);
    Ok(ActionResult::ok("User deleted successfully"))
}

//----------------------- Implementation --------------------------

/// Newest first. The optional query matches the name, case-insensitively.
pub async fn list_users(
    pool: &PgPool,
    name_query: Option<&str>,
    page: i64,
    page_size: i64,
) -> Result<Paginated<User>, anyhow::Error> {
    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, name_query: Option<&'a str>) {
        if let Some(name) = name_query {
            builder
                .push(" WHERE name ILIKE ")
                .push_bind(format!("%{name}%"));
        }
    }

    let mut count_query = QueryBuilder::new("SELECT count(*) FROM users");
    push_filter(&mut count_query, name_query);
    let row_count: i64 = count_query
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .context("Problem counting users.")?;

    let mut page_query = QueryBuilder::new(
        "SELECT user_id, name, email, role, address, payment_method, created_at FROM users",
    );
    push_filter(&mut page_query, name_query);
    page_query
        .push(" ORDER BY created_at DESC, user_id DESC LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind(offset(page, page_size));
    let rows: Vec<UserRow> = page_query
        .build_query_as()
        .fetch_all(pool)
        .await
        .context("Problem reading users page.")?;

    Ok(Paginated {
        data: rows.into_iter().map(Into::into).collect(),
        total_pages: total_pages(row_count, page_size),
    })
}

pub async fn update_user(
    pool: &PgPool,
    user_id: UserId,
    name: &str,
    role: Role,
) -> Result<(), ClientError> {
    let result = sqlx::query("UPDATE users SET name = $2, role = $3 WHERE user_id = $1")
        .bind(user_id)
        .bind(name)
        .bind(role)
        .execute(pool)
        .await
        .with_context(|| format!("Problem updating user {user_id}."))?;
    if result.rows_affected() == 0 {
        return Err(UserError::UserNotFound.into());
    }
    Ok(())
}

/// The user's cart, orders and reviews go with them.
pub async fn delete_user(pool: &PgPool, user_id: UserId) -> Result<(), ClientError> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .with_context(|| format!("Problem deleting user {user_id}."))?;
    if result.rows_affected() == 0 {
        return Err(UserError::UserNotFound.into());
    }
    Ok(())
}

//-------------------------- Tests -------------------------------
